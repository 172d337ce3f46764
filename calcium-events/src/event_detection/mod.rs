//! Tools for converting a fluorescence series into a per-sample event mask.
//!
//! A series is smoothed, tracked by a causal rolling median and MAD, and
//! classified by one of the [Detector]s. Typical usage looks like:
//! ```ignore
//! let smoothed = SavitzkyGolay::new(15, 3)?.apply(&values)?;
//! let detection = HysteresisDetector::from_settings(&settings)?.detect(&time, &smoothed)?;
//! let refined = refine(&detection, &settings.refinement());
//! ```
//! The detectors only mark transition samples: `rising` where an event
//! starts, `falling` where it ends and `quiet` everywhere else. Interval
//! semantics are derived by the refiner and the stimulus mapper.

pub mod datatype;
pub mod detectors;
pub mod refine;
pub(crate) mod save_to_file;
pub mod window;

pub use calcium_common::Real;
pub use datatype::{EventLabel, EventMask, Evidence, Run};
pub use detectors::{
    Detection, Detector, derivative_detector::DerivativeDetector,
    hysteresis_detector::HysteresisDetector,
};
pub use refine::{RefineSettings, refine};
pub(crate) use save_to_file::SaveToFileFilter;
pub use window::{BaselineTrace, DispersionTrace, SavitzkyGolay, derivative, smooth, track};
