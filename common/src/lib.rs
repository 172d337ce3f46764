pub mod dataset;
pub mod metrics;
pub mod tracer;

pub use dataset::{Dataset, Interval, Series, StimulusWindow};

/// Scalar type used for every time and fluorescence value.
pub type Real = f64;

/// Identifier of one imaged cell (ROI).
pub type CellId = String;

/// Position of a sample within a series.
pub type SampleIndex = usize;

/// Seconds per minute; time axes are expressed in minutes.
pub const SECONDS_PER_MINUTE: Real = 60.0;
