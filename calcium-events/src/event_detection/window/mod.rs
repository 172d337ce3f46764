pub(crate) mod baseline;
pub(crate) mod finite_differences;
pub(crate) mod smoothing_window;

use super::Real;
pub use baseline::{BaselineTrace, DispersionTrace, track};
pub(crate) use baseline::{
    Centre, RobustEstimate, RobustWindow, check_window, median_of_sorted, track_scale,
};
pub use finite_differences::derivative;
pub use smoothing_window::{SavitzkyGolay, smooth};

/// A causal window fed one sample at a time.
pub(crate) trait Window: Clone {
    type InputType: Copy;
    type OutputType;

    /// Pushes a value into the window, returning `true` once output is available.
    fn push(&mut self, value: Self::InputType) -> bool;
    fn output(&self) -> Option<Self::OutputType>;
}
