use super::{Real, Window};
use crate::error::AnalysisError;
use std::collections::VecDeque;

/// Causal rolling median, one value per sample.
pub type BaselineTrace = Vec<Real>;
/// Causal rolling MAD scaled to a standard deviation, one value per sample.
pub type DispersionTrace = Vec<Real>;

/// Makes the MAD a consistent estimator of the standard deviation under normality.
pub(crate) const MAD_SCALE: Real = 1.4826;

/// The centre deviations are measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Centre {
    Median,
    /// For series assumed to be locally zero-mean, such as derivatives.
    Zero,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub(crate) struct RobustEstimate {
    pub(crate) baseline: Real,
    pub(crate) dispersion: Real,
}

pub(crate) fn median_of_sorted(sorted: &[Real]) -> Option<Real> {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted.get(mid).copied()
    } else {
        Some((sorted.get(mid.checked_sub(1)?)? + sorted.get(mid)?) / 2.0)
    }
}

/// Trailing window of at most `capacity` samples, kept both in arrival
/// order and sorted so the median is available without a full sort.
/// Before `capacity` samples have arrived the window covers all of them.
#[derive(Debug, Clone)]
pub(crate) struct RobustWindow {
    capacity: usize,
    centre: Centre,
    history: VecDeque<Real>,
    sorted: Vec<Real>,
    estimate: Option<RobustEstimate>,
}

impl RobustWindow {
    pub(crate) fn new(capacity: usize, centre: Centre) -> Self {
        Self {
            capacity,
            centre,
            history: VecDeque::with_capacity(capacity),
            sorted: Vec::with_capacity(capacity),
            estimate: None,
        }
    }

    /// Whether `capacity` samples have arrived.
    pub(crate) fn is_full(&self) -> bool {
        self.history.len() == self.capacity
    }

    /// The most recently pushed value.
    pub(crate) fn latest(&self) -> Option<Real> {
        self.history.back().copied()
    }

    fn position(&self, value: Real) -> usize {
        self.sorted.partition_point(|x| x.total_cmp(&value).is_lt())
    }

    fn insert(&mut self, value: Real) {
        let index = self.position(value);
        self.sorted.insert(index, value);
    }

    fn evict(&mut self, value: Real) {
        let index = self.position(value);
        if self
            .sorted
            .get(index)
            .is_some_and(|x| x.total_cmp(&value).is_eq())
        {
            self.sorted.remove(index);
        }
    }

    fn estimate(&self) -> Option<RobustEstimate> {
        let baseline = match self.centre {
            Centre::Median => median_of_sorted(&self.sorted)?,
            Centre::Zero => 0.0,
        };
        let mut deviations: Vec<Real> = self
            .sorted
            .iter()
            .map(|value| (value - baseline).abs())
            .collect();
        deviations.sort_by(Real::total_cmp);
        Some(RobustEstimate {
            baseline,
            dispersion: MAD_SCALE * median_of_sorted(&deviations)?,
        })
    }
}

impl Window for RobustWindow {
    type InputType = Real;
    type OutputType = RobustEstimate;

    fn push(&mut self, value: Real) -> bool {
        if self.is_full() {
            if let Some(oldest) = self.history.pop_front() {
                self.evict(oldest);
            }
        }
        self.history.push_back(value);
        self.insert(value);
        self.estimate = self.estimate();
        self.estimate.is_some()
    }

    fn output(&self) -> Option<RobustEstimate> {
        self.estimate
    }
}

pub(crate) fn check_window(
    len: usize,
    window_length: usize,
    name: &'static str,
) -> Result<(), AnalysisError> {
    if window_length < 2 {
        return Err(AnalysisError::invalid(
            name,
            format!("{window_length} is less than 2"),
        ));
    }
    if len <= window_length {
        return Err(AnalysisError::InsufficientData {
            len,
            required: window_length + 1,
            requirement: name,
        });
    }
    Ok(())
}

fn estimates(values: &[Real], window_length: usize, centre: Centre) -> Vec<RobustEstimate> {
    let mut window = RobustWindow::new(window_length, centre);
    values
        .iter()
        .map(|&value| {
            window.push(value);
            window.output().unwrap_or_default()
        })
        .collect()
}

/// Rolling median baseline and MAD dispersion over the trailing
/// `window_length` samples, including the current one.
pub fn track(
    values: &[Real],
    window_length: usize,
) -> Result<(BaselineTrace, DispersionTrace), AnalysisError> {
    check_window(values.len(), window_length, "baseline_window")?;
    Ok(estimates(values, window_length, Centre::Median)
        .into_iter()
        .map(|estimate| (estimate.baseline, estimate.dispersion))
        .unzip())
}

/// Rolling MAD about zero over the trailing `window_length` samples.
pub(crate) fn track_scale(
    values: &[Real],
    window_length: usize,
) -> Result<DispersionTrace, AnalysisError> {
    check_window(values.len(), window_length, "derivative_window")?;
    Ok(estimates(values, window_length, Centre::Zero)
        .into_iter()
        .map(|estimate| estimate.dispersion)
        .collect())
}
