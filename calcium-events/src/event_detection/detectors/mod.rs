pub mod derivative_detector;
pub mod hysteresis_detector;

use super::{BaselineTrace, DispersionTrace, EventMask, Evidence, Real};
use crate::error::AnalysisError;

/// Everything a detector derives from one series.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub mask: EventMask,
    /// The series that was classified, for the refiner.
    pub evidence: Evidence,
    pub baseline: BaselineTrace,
    pub dispersion: DispersionTrace,
}

/// Produces an [EventMask] from a series sampled at `time`.
pub trait Detector {
    fn detect(&self, time: &[Real], values: &[Real]) -> Result<Detection, AnalysisError>;
}
