use calcium_common::{CellId, metrics::failures::FailureKind};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("Insufficient data: {len} samples, {requirement} requires {required}")]
    InsufficientData {
        len: usize,
        required: usize,
        requirement: &'static str,
    },
    #[error("Malformed input: {0}")]
    MalformedInput(String),
}

impl AnalysisError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// The shared label for per-entity failures, `None` for precondition errors.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::InvalidParameter { .. } => None,
            Self::InsufficientData { .. } => Some(FailureKind::InsufficientData),
            Self::MalformedInput(_) => Some(FailureKind::MalformedInput),
        }
    }
}

/// The entity a [FailureReport] is isolated to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Cell(CellId),
    Stimulus(String),
}

/// A data-level failure that was isolated from the rest of the batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureReport {
    pub entity: Entity,
    pub kind: FailureKind,
    pub message: String,
}

impl FailureReport {
    /// Returns `None` for [AnalysisError::InvalidParameter], which is never isolated.
    pub(crate) fn new(entity: Entity, error: &AnalysisError) -> Option<Self> {
        Some(Self {
            entity,
            kind: error.failure_kind()?,
            message: error.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_errors_are_not_reported() {
        let error = AnalysisError::invalid("k_up", "must be positive");
        assert!(FailureReport::new(Entity::Cell("ROI_1".into()), &error).is_none());
    }

    #[test]
    fn data_errors_carry_their_kind() {
        let error = AnalysisError::InsufficientData {
            len: 4,
            required: 15,
            requirement: "smoothing_window",
        };
        let report = FailureReport::new(Entity::Cell("ROI_1".into()), &error).unwrap();
        assert_eq!(report.kind, FailureKind::InsufficientData);
        assert_eq!(
            report.message,
            "Insufficient data: 4 samples, smoothing_window requires 15"
        );
    }
}
