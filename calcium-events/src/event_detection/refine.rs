//! Reconciles a detector's transition mask into coherent events.
//!
//! Onsets are extended backward over a lead-in that already trends toward
//! the event, offsets forward over the decay that follows, and events whose
//! offset and next onset are separated by fewer than `merge_gap` quiet
//! samples are merged into one.
use super::{Detection, EventLabel, EventMask, Evidence, Real, Run};

#[derive(Debug, Clone, PartialEq)]
pub struct RefineSettings {
    pub lookback: usize,
    pub lookahead: usize,
    pub merge_gap: usize,
    pub agree_fraction: Real,
}

/// The earliest (or latest) qualifying sample of `examined`, provided at
/// least `agree_fraction` of the examined samples qualify.
fn agreeing_extent(
    examined: impl Iterator<Item = usize>,
    qualifies: impl Fn(usize) -> bool,
    agree_fraction: Real,
) -> Option<(usize, usize)> {
    let mut num_examined = 0;
    let mut qualifying = Vec::new();
    for index in examined {
        num_examined += 1;
        if qualifies(index) {
            qualifying.push(index);
        }
    }
    if num_examined == 0 || (qualifying.len() as Real) < agree_fraction * num_examined as Real {
        return None;
    }
    Option::zip(qualifying.first().copied(), qualifying.last().copied())
}

fn extend_onsets(mask: &mut EventMask, evidence: &Evidence, settings: &RefineSettings) {
    let runs = mask.runs();
    for (index, run) in runs.iter().enumerate() {
        if run.label != EventLabel::Rising {
            continue;
        }
        let floor = index
            .checked_sub(1)
            .and_then(|previous| runs.get(previous))
            .map(|previous| previous.end + 1)
            .unwrap_or_default();
        let from = run.start.saturating_sub(settings.lookback).max(floor);
        if let Some((earliest, _)) = agreeing_extent(
            from..run.start,
            |j| evidence.supports_onset(j),
            settings.agree_fraction,
        ) {
            mask.labels_mut()[earliest..run.start].fill(EventLabel::Rising);
        }
    }
}

fn extend_offsets(mask: &mut EventMask, evidence: &Evidence, settings: &RefineSettings) {
    let runs = mask.runs();
    let len = mask.len();
    for (index, run) in runs.iter().enumerate() {
        if run.label != EventLabel::Falling {
            continue;
        }
        let ceiling = runs.get(index + 1).map(|next| next.start).unwrap_or(len);
        let to = (run.end + 1 + settings.lookahead).min(ceiling);
        if let Some((_, latest)) = agreeing_extent(
            run.end + 1..to,
            |j| evidence.supports_offset(j),
            settings.agree_fraction,
        ) {
            mask.labels_mut()[run.end + 1..=latest].fill(EventLabel::Falling);
        }
    }
}

/// Number of quiet samples strictly between `falling` and the following `rising`.
fn gap(falling: &Run, rising: &Run) -> usize {
    rising.start - falling.end - 1
}

fn merge_fragments(mask: &mut EventMask, merge_gap: usize) {
    let runs = mask.runs();
    let mut seen_rising = false;
    let mut index = 0;
    while let Some(run) = runs.get(index) {
        match run.label {
            EventLabel::Rising => seen_rising = true,
            EventLabel::Falling if seen_rising => {
                if let Some(next) = runs.get(index + 1) {
                    if next.label == EventLabel::Rising && gap(run, next) < merge_gap {
                        let labels = mask.labels_mut();
                        labels[run.start..=run.end].fill(EventLabel::Quiet);
                        labels[next.start..=next.end].fill(EventLabel::Quiet);
                        index += 2;
                        continue;
                    }
                }
            }
            _ => {}
        }
        index += 1;
    }
}

/// Applies backward extension, forward extension and gap merging, in that order.
pub fn refine(detection: &Detection, settings: &RefineSettings) -> EventMask {
    let mut mask = detection.mask.clone();
    extend_onsets(&mut mask, &detection.evidence, settings);
    extend_offsets(&mut mask, &detection.evidence, settings);
    merge_fragments(&mut mask, settings.merge_gap);
    mask
}
