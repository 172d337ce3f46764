use crate::event_detection::Real;

/// The series a detector classified, kept so the refiner can judge
/// whether samples around a transition trend toward the event.
#[derive(Debug, Clone, PartialEq)]
pub enum Evidence {
    /// Signal levels: a sample supports an onset when the signal rises into
    /// the next sample, and an offset when it is still falling from the
    /// previous one.
    Level(Vec<Real>),
    /// Derivative values: a sample supports an onset when positive and an
    /// offset when negative.
    Slope(Vec<Real>),
}

impl Evidence {
    pub fn values(&self) -> &[Real] {
        match self {
            Evidence::Level(values) | Evidence::Slope(values) => values,
        }
    }

    /// Whether sample `index` trends toward an event starting after it.
    pub(crate) fn supports_onset(&self, index: usize) -> bool {
        match self {
            Evidence::Level(values) => Option::zip(values.get(index), values.get(index + 1))
                .is_some_and(|(value, next)| value < next),
            Evidence::Slope(slopes) => slopes.get(index).is_some_and(|slope| *slope > 0.0),
        }
    }

    /// Whether sample `index` continues the decay of an event ending before it.
    pub(crate) fn supports_offset(&self, index: usize) -> bool {
        match self {
            Evidence::Level(values) => index
                .checked_sub(1)
                .and_then(|previous| Option::zip(values.get(index), values.get(previous)))
                .is_some_and(|(value, previous)| value < previous),
            Evidence::Slope(slopes) => slopes.get(index).is_some_and(|slope| *slope < 0.0),
        }
    }
}
