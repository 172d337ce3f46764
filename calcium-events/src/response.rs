//! Quantifies mapped events on the unsmoothed series.
use crate::{event_detection::Real, mapping::MappedEvent};
use calcium_common::CellId;
use itertools::Itertools;
use serde::Serialize;

/// Metrics of one event, computed on the signal after subtracting the
/// straight line joining its first and last samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventResponse {
    pub start_time: Real,
    pub end_time: Real,
    pub auc: Real,
    /// Area over the first `early_window` minutes of the event.
    pub auc_first_minute: Real,
    pub peak: Real,
    pub duration: Real,
    pub truncated: bool,
}

/// The outcome for one (cell, stimulus) pair. A `None` response means the
/// cell did not respond, which is not a failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub cell_id: CellId,
    pub stimulus_name: String,
    pub response: Option<EventResponse>,
}

impl EventRecord {
    pub fn is_response(&self) -> bool {
        self.response.is_some()
    }
}

/// Trapezoidal integral of `(time, value)` points.
pub fn trapezoid(points: impl IntoIterator<Item = (Real, Real)>) -> Real {
    points
        .into_iter()
        .tuple_windows()
        .map(|((t0, v0), (t1, v1))| 0.5 * (v0 + v1) * (t1 - t0))
        .sum()
}

/// Measures `event` on `values`, integrating the first `early_window` time units separately.
/// Returns `None` if the event's indices do not lie within the series.
pub fn measure(
    time: &[Real],
    values: &[Real],
    event: &MappedEvent,
    early_window: Real,
) -> Option<EventResponse> {
    let time = time.get(event.start..=event.end)?;
    let values = values.get(event.start..=event.end)?;
    let (&start_time, &end_time) = Option::zip(time.first(), time.last())?;
    let (&start_value, &end_value) = Option::zip(values.first(), values.last())?;

    let slope = (end_value - start_value) / (end_time - start_time);
    let corrected: Vec<(Real, Real)> = time
        .iter()
        .zip(values)
        .map(|(&t, &v)| (t, v - (start_value + slope * (t - start_time))))
        .collect();

    let cutoff = start_time + early_window;
    let auc_first_minute = if cutoff >= end_time {
        trapezoid(corrected.iter().copied())
    } else {
        let within = corrected.partition_point(|&(t, _)| t <= cutoff);
        let boundary = Option::zip(
            within.checked_sub(1).and_then(|last| corrected.get(last)),
            corrected.get(within),
        )
        .filter(|((t0, _), _)| *t0 < cutoff)
        .map(|(&(t0, v0), &(t1, v1))| (cutoff, v0 + (v1 - v0) * (cutoff - t0) / (t1 - t0)));
        trapezoid(corrected.iter().take(within).copied().chain(boundary))
    };

    Some(EventResponse {
        start_time,
        end_time,
        auc: trapezoid(corrected.iter().copied()),
        auc_first_minute,
        peak: corrected
            .iter()
            .map(|&(_, value)| value)
            .fold(Real::NEG_INFINITY, Real::max),
        duration: end_time - start_time,
        truncated: event.truncated,
    })
}
