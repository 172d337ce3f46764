use metrics::{describe_gauge, gauge};

pub fn component_info_metric(name: &'static str) {
    static NAME: &str = "calcium_pipeline_component_info";

    describe_gauge!(NAME, "Basic information about the component");

    let git_rev = option_env!("GIT_VERSION").unwrap_or("unknown");
    gauge!(NAME, "component" => name, "git_version" => git_rev).set(1);
}

pub mod names {
    pub const CELLS_PROCESSED: &str = "calcium_pipeline_cells_processed";
    pub const FAILURES: &str = "calcium_pipeline_failures";
    pub const RESPONSES: &str = "calcium_pipeline_responses";
    pub const NO_RESPONSES: &str = "calcium_pipeline_no_responses";
}

pub mod failures {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum FailureKind {
        InsufficientData,
        MalformedInput,
    }

    // Label building function
    pub fn get_label(failure_kind: FailureKind) -> (&'static str, &'static str) {
        (
            "failure_kind",
            match failure_kind {
                FailureKind::InsufficientData => "insufficient_data",
                FailureKind::MalformedInput => "malformed_input",
            },
        )
    }
}

pub mod responses {
    // Label building function
    pub fn get_label(stimulus: &str) -> (&'static str, String) {
        ("stimulus", stimulus.to_owned())
    }
}
