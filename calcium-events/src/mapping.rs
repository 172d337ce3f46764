//! Aligns refined events to stimulus windows.
//!
//! The window searched for stimulus `k` runs from its start up to the start
//! of stimulus `k + 1`, or to the end of the record for the last stimulus.
use crate::event_detection::{EventLabel, EventMask, Real};
use calcium_common::{SampleIndex, StimulusWindow};
use serde::Serialize;

/// Sample indices of the event attributed to one stimulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MappedEvent {
    pub start: SampleIndex,
    pub end: SampleIndex,
    /// No falling sample followed the onset before the window closed, so the
    /// end was clamped to the window's last sample.
    pub truncated: bool,
}

/// Finds the event in the samples `[first, close)`, if any.
fn map_window(mask: &EventMask, first: usize, close: usize) -> Option<MappedEvent> {
    let labels = mask.labels().get(first..close)?;
    let onset = first + labels.iter().position(|&label| label == EventLabel::Rising)?;

    let offset = labels
        .iter()
        .rposition(|&label| label == EventLabel::Falling)
        .map(|index| first + index)
        .filter(|&end| end > onset);
    let (end, truncated) = match offset {
        Some(end) => (end, false),
        None => (close.checked_sub(1)?, true),
    };
    (end > onset).then_some(MappedEvent {
        start: onset,
        end,
        truncated,
    })
}

/// One entry per stimulus, `None` where the cell did not respond.
/// `stimuli` must be ordered and non-overlapping.
pub fn map_events(
    time: &[Real],
    mask: &EventMask,
    stimuli: &[StimulusWindow],
) -> Vec<Option<MappedEvent>> {
    let len = mask.len().min(time.len());
    let index_of = |at: Real| time.partition_point(|&t| t < at).min(len);
    stimuli
        .iter()
        .enumerate()
        .map(|(k, stimulus)| {
            let close = stimuli
                .get(k + 1)
                .map(|next| index_of(next.start))
                .unwrap_or(len);
            map_window(mask, index_of(stimulus.start), close)
        })
        .collect()
}
