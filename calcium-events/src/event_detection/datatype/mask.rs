use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Per-sample classification produced by a detector.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLabel {
    #[default]
    Quiet,
    Rising,
    Falling,
}

impl Display for EventLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventLabel::Quiet => write!(f, "0"),
            EventLabel::Rising => write!(f, "1"),
            EventLabel::Falling => write!(f, "-1"),
        }
    }
}

/// A maximal block of consecutive samples sharing one non-quiet label.
/// `end` is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub label: EventLabel,
    pub start: usize,
    pub end: usize,
}

impl Run {
    pub fn num_samples(&self) -> usize {
        self.end + 1 - self.start
    }
}

/// One [EventLabel] per sample of the series it was derived from.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventMask(Vec<EventLabel>);

impl EventMask {
    /// An all-quiet mask of length `len`.
    pub fn quiet(len: usize) -> Self {
        Self(vec![EventLabel::Quiet; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn labels(&self) -> &[EventLabel] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<EventLabel> {
        self.0.get(index).copied()
    }

    pub(crate) fn labels_mut(&mut self) -> &mut [EventLabel] {
        &mut self.0
    }

    /// Every maximal run of non-quiet labels, in order.
    pub fn runs(&self) -> Vec<Run> {
        let mut runs = Vec::<Run>::new();
        for (index, &label) in self.0.iter().enumerate() {
            if label == EventLabel::Quiet {
                continue;
            }
            match runs.last_mut() {
                Some(run) if run.label == label && run.end + 1 == index => run.end = index,
                _ => runs.push(Run {
                    label,
                    start: index,
                    end: index,
                }),
            }
        }
        runs
    }

    /// Number of rising runs, i.e. the number of distinct event onsets.
    pub fn num_onsets(&self) -> usize {
        self.runs()
            .iter()
            .filter(|run| run.label == EventLabel::Rising)
            .count()
    }
}

impl From<Vec<EventLabel>> for EventMask {
    fn from(labels: Vec<EventLabel>) -> Self {
        Self(labels)
    }
}

impl FromIterator<EventLabel> for EventMask {
    fn from_iter<T: IntoIterator<Item = EventLabel>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a mask from a string of `+`, `-` and `.` characters.
    pub(crate) fn mask(pattern: &str) -> EventMask {
        pattern
            .chars()
            .map(|c| match c {
                '+' => EventLabel::Rising,
                '-' => EventLabel::Falling,
                _ => EventLabel::Quiet,
            })
            .collect()
    }

    #[test]
    fn runs_split_on_label_change_and_gaps() {
        let runs = mask("..++-..+.+--").runs();
        assert_eq!(
            runs,
            vec![
                Run {
                    label: EventLabel::Rising,
                    start: 2,
                    end: 3
                },
                Run {
                    label: EventLabel::Falling,
                    start: 4,
                    end: 4
                },
                Run {
                    label: EventLabel::Rising,
                    start: 7,
                    end: 7
                },
                Run {
                    label: EventLabel::Rising,
                    start: 9,
                    end: 9
                },
                Run {
                    label: EventLabel::Falling,
                    start: 10,
                    end: 11
                },
            ]
        );
        assert_eq!(runs.last().map(Run::num_samples), Some(2));
    }

    #[test]
    fn quiet_mask_has_no_onsets() {
        let mask = EventMask::quiet(7);
        assert_eq!(mask.len(), 7);
        assert!(mask.runs().is_empty());
        assert_eq!(mask.num_onsets(), 0);
    }

    #[test]
    fn labels_serialize_by_name() {
        let json = serde_json::to_string(&mask("+.-")).unwrap();
        assert_eq!(json, r#"["rising","quiet","falling"]"#);
    }

    #[test]
    fn labels_display_as_signed_units() {
        let text: Vec<_> = mask("+.-").labels().iter().map(ToString::to_string).collect();
        assert_eq!(text, ["1", "0", "-1"]);
    }
}
