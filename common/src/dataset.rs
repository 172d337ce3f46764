//! Plain data exchanged between the engine and its collaborators.
//!
//! These types carry no validation of their own: a [Dataset] is whatever the
//! loader produced, and it is the analysis engine's job to reject malformed
//! cells or stimulus windows individually.
use crate::{CellId, Real};
use serde::{Deserialize, Serialize};

/// One cell's fluorescence trace, sampled on its own time axis (minutes).
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub id: CellId,
    pub time: Vec<Real>,
    pub values: Vec<Real>,
}

impl Series {
    pub fn new(id: impl Into<CellId>, time: Vec<Real>, values: Vec<Real>) -> Self {
        Self {
            id: id.into(),
            time,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over `(time, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Real, Real)> + '_ {
        self.time.iter().copied().zip(self.values.iter().copied())
    }

    /// Returns a copy of this series carrying `values` on the same time axis.
    pub fn with_values(&self, values: Vec<Real>) -> Self {
        Self {
            id: self.id.clone(),
            time: self.time.clone(),
            values,
        }
    }
}

/// A labelled stimulus application, in minutes.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusWindow {
    pub name: String,
    pub start: Real,
    pub end: Real,
}

impl StimulusWindow {
    pub fn new(name: impl Into<String>, start: Real, end: Real) -> Self {
        Self {
            name: name.into(),
            start,
            end,
        }
    }
}

/// Closed time interval, in minutes.
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub start: Real,
    pub end: Real,
}

impl Interval {
    pub fn new(start: Real, end: Real) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, time: Real) -> bool {
        self.start <= time && time <= self.end
    }
}

/// Everything loaded for one experiment.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub cells: Vec<Series>,
    pub stimuli: Vec<StimulusWindow>,
    /// Artefact intervals to be bridged by interpolation before analysis.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusions: Vec<Interval>,
}

impl Dataset {
    pub fn new(cells: Vec<Series>, stimuli: Vec<StimulusWindow>) -> Self {
        Self {
            cells,
            stimuli,
            exclusions: Vec::new(),
        }
    }

    /// Builds a dataset whose cells all share the time axis `time`.
    pub fn from_shared_axis(
        time: &[Real],
        columns: impl IntoIterator<Item = (CellId, Vec<Real>)>,
        stimuli: Vec<StimulusWindow>,
    ) -> Self {
        let cells = columns
            .into_iter()
            .map(|(id, values)| Series::new(id, time.to_vec(), values))
            .collect();
        Self::new(cells, stimuli)
    }

    pub fn with_exclusions(mut self, exclusions: Vec<Interval>) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn cell(&self, id: &str) -> Option<&Series> {
        self.cells.iter().find(|series| series.id == id)
    }
}
