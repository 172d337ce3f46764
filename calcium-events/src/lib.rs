//! Adaptive detection and quantification of calcium-imaging responses.
//!
//! Each cell's fluorescence series is smoothed, classified by a hysteresis
//! detector and a derivative detector, refined, aligned to the stimulus
//! windows and measured. [analyze] runs the whole pipeline over a [Dataset]
//! in parallel across cells.
//!
//! [Dataset]: calcium_common::Dataset
pub mod dataset;
pub mod error;
pub mod event_detection;
pub mod mapping;
pub mod metrics;
pub mod parameters;
pub mod processing;
pub mod response;

pub use dataset::DatasetSummary;
pub use error::{AnalysisError, Entity, FailureReport};
pub use parameters::{DetectorSettings, EventSource, SignalSource};
pub use processing::{
    AnalysisResult, CellAnalysis, StimulusResponseSummary, analyze, get_save_file_name,
    save_cell_traces,
};
pub use response::{EventRecord, EventResponse};
