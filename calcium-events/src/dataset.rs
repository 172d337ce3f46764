//! Validation and conditioning of a loaded [Dataset] before analysis.
use crate::{
    error::{AnalysisError, Entity, FailureReport},
    event_detection::{Real, window::median_of_sorted},
    parameters::DetectorSettings,
};
use calcium_common::{Dataset, Interval, SECONDS_PER_MINUTE, Series, StimulusWindow};
use itertools::Itertools;
use serde::Serialize;

/// Rejects series with mismatched axes, non-finite samples or a time axis
/// that is not strictly increasing. Non-finite values inside an exclusion are
/// accepted when [condition] has at least two retained samples to bridge them.
pub(crate) fn validate_series(
    series: &Series,
    exclusions: &[Interval],
) -> Result<(), AnalysisError> {
    if series.time.len() != series.values.len() {
        return Err(AnalysisError::MalformedInput(format!(
            "{} time points for {} values",
            series.time.len(),
            series.values.len()
        )));
    }
    if let Some((index, _)) = series.time.iter().find_position(|t| !t.is_finite()) {
        return Err(AnalysisError::MalformedInput(format!(
            "time {index} is not finite"
        )));
    }
    let num_retained = series
        .time
        .iter()
        .filter(|&&time| !is_excluded(exclusions, time))
        .count();
    let bridged = |time: Real| num_retained >= 2 && is_excluded(exclusions, time);
    if let Some((index, _)) = series
        .iter()
        .find_position(|&(time, value)| !value.is_finite() && !bridged(time))
    {
        return Err(AnalysisError::MalformedInput(format!(
            "value {index} is not finite"
        )));
    }
    if let Some((index, _)) = series
        .time
        .iter()
        .tuple_windows()
        .find_position(|(before, after)| after <= before)
    {
        return Err(AnalysisError::MalformedInput(format!(
            "time axis is not strictly increasing at sample {}",
            index + 1
        )));
    }
    Ok(())
}

/// Checks a series of `len` samples against every window the settings require.
pub(crate) fn check_length(len: usize, settings: &DetectorSettings) -> Result<(), AnalysisError> {
    for (requirement, required) in [
        ("derivative", 2),
        ("smoothing_window", settings.smoothing_window),
        ("baseline_window", settings.baseline_window + 1),
        ("derivative_window", settings.derivative_window() + 1),
        ("lookback", settings.lookback),
        ("lookahead", settings.lookahead),
    ] {
        if len < required {
            return Err(AnalysisError::InsufficientData {
                len,
                required,
                requirement,
            });
        }
    }
    Ok(())
}

/// Accepts stimulus windows in order, dropping any that are empty, not
/// finite, or that overlap the previously accepted window.
pub(crate) fn validate_stimuli(
    stimuli: &[StimulusWindow],
) -> (Vec<StimulusWindow>, Vec<FailureReport>) {
    let mut accepted = Vec::<StimulusWindow>::with_capacity(stimuli.len());
    let mut failures = Vec::new();
    for stimulus in stimuli {
        let problem = if !(stimulus.start.is_finite() && stimulus.end.is_finite()) {
            Some("bounds are not finite".to_owned())
        } else if stimulus.end <= stimulus.start {
            Some(format!(
                "ends at {} which is not after its start {}",
                stimulus.end, stimulus.start
            ))
        } else {
            accepted
                .last()
                .filter(|previous| stimulus.start < previous.end)
                .map(|previous| {
                    format!(
                        "starts at {} before {} ends at {}",
                        stimulus.start, previous.name, previous.end
                    )
                })
        };
        match problem {
            Some(problem) => {
                let error =
                    AnalysisError::MalformedInput(format!("stimulus {}: {problem}", stimulus.name));
                tracing::warn!("{error}");
                failures.extend(FailureReport::new(
                    Entity::Stimulus(stimulus.name.clone()),
                    &error,
                ));
            }
            None => accepted.push(stimulus.clone()),
        }
    }
    (accepted, failures)
}

fn is_excluded(exclusions: &[Interval], time: Real) -> bool {
    exclusions.iter().any(|interval| interval.contains(time))
}

fn interpolate(kept: &[(Real, Real)], time: Real) -> Option<Real> {
    let index = kept.partition_point(|(t, _)| *t < time);
    match (
        index.checked_sub(1).and_then(|before| kept.get(before)),
        kept.get(index),
    ) {
        (Some(&(t0, v0)), Some(&(t1, v1))) => Some(v0 + (v1 - v0) * (time - t0) / (t1 - t0)),
        (Some(&(_, value)), None) | (None, Some(&(_, value))) => Some(value),
        (None, None) => None,
    }
}

/// Replaces samples inside any exclusion interval by linear interpolation
/// between the nearest retained samples, holding the edge value beyond the
/// first and last retained sample. Series with fewer than two retained
/// samples are returned unchanged.
pub(crate) fn condition(series: &Series, exclusions: &[Interval]) -> Vec<Real> {
    let excluded = |time: Real| is_excluded(exclusions, time);
    let kept: Vec<(Real, Real)> = series.iter().filter(|(t, _)| !excluded(*t)).collect();
    if kept.len() == series.len() || kept.len() < 2 {
        return series.values.clone();
    }
    series
        .iter()
        .map(|(time, value)| {
            if excluded(time) {
                interpolate(&kept, time).unwrap_or(value)
            } else {
                value
            }
        })
        .collect()
}

/// Descriptive statistics of a loaded dataset.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub num_cells: usize,
    /// Samples in the first cell.
    pub num_samples: usize,
    /// Span of the first cell's time axis, in minutes.
    pub duration: Real,
    /// Estimated from the median sampling interval; zero when it cannot be estimated.
    pub sampling_rate_hz: Real,
    pub stimuli: Vec<String>,
}

impl DatasetSummary {
    pub fn new(dataset: &Dataset) -> Self {
        let first = dataset.cells.first();
        let time = first.map(|series| series.time.as_slice()).unwrap_or_default();
        let duration = Option::zip(time.first(), time.last())
            .map(|(first, last)| last - first)
            .unwrap_or_default();

        let intervals: Vec<Real> = time
            .iter()
            .tuple_windows()
            .map(|(before, after)| after - before)
            .sorted_by(Real::total_cmp)
            .collect();
        let sampling_rate_hz = median_of_sorted(&intervals)
            .filter(|interval| interval.is_finite() && *interval > 0.0)
            .map(|interval| 1.0 / (interval * SECONDS_PER_MINUTE))
            .unwrap_or_default();

        Self {
            num_cells: dataset.cells.len(),
            num_samples: first.map(Series::len).unwrap_or_default(),
            duration,
            sampling_rate_hz,
            stimuli: dataset
                .stimuli
                .iter()
                .map(|stimulus| stimulus.name.clone())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn series(time: Vec<Real>, values: Vec<Real>) -> Series {
        Series::new("ROI_1", time, values)
    }

    #[test]
    fn well_formed_series_passes() {
        assert!(validate_series(&series(vec![0.0, 0.1, 0.2], vec![0.1, 0.2, 0.1]), &[]).is_ok());
    }

    #[test]
    fn malformed_series_are_rejected() {
        for series in [
            series(vec![0.0, 0.1], vec![0.1, 0.2, 0.3]),
            series(vec![0.0, 0.1, 0.1], vec![0.1, 0.2, 0.3]),
            series(vec![0.0, 0.2, 0.1], vec![0.1, 0.2, 0.3]),
            series(vec![0.0, 0.1, 0.2], vec![0.1, Real::NAN, 0.3]),
            series(vec![0.0, Real::INFINITY, 0.2], vec![0.1, 0.2, 0.3]),
        ] {
            assert!(matches!(
                validate_series(&series, &[]),
                Err(AnalysisError::MalformedInput(_))
            ));
        }
    }

    #[test]
    fn dropped_frames_inside_exclusions_are_accepted() {
        let series = series(
            vec![0.0, 1.0, 2.0, 3.0, 4.0],
            vec![0.1, Real::NAN, Real::INFINITY, 0.4, 0.5],
        );
        let exclusions = [Interval::new(0.5, 2.5)];
        assert!(validate_series(&series, &exclusions).is_ok());
        let conditioned = condition(&series, &exclusions);
        let expected = [0.1, 0.2, 0.3, 0.4, 0.5];
        for (actual, expected) in conditioned.iter().zip(expected) {
            assert_approx_eq!(actual, expected, 1e-12);
        }
        assert!(matches!(
            validate_series(&series, &[Interval::new(1.5, 2.5)]),
            Err(AnalysisError::MalformedInput(_))
        ));
    }

    #[test]
    fn unbridged_non_finite_values_are_rejected() {
        let series = series(vec![0.0, 1.0, 2.0], vec![0.1, Real::NAN, 0.3]);
        assert!(matches!(
            validate_series(&series, &[Interval::new(0.5, 2.5)]),
            Err(AnalysisError::MalformedInput(_))
        ));
    }

    #[test]
    fn length_requirements() {
        let settings = DetectorSettings::default();
        assert!(check_length(21, &settings).is_ok());
        assert_eq!(
            check_length(20, &settings),
            Err(AnalysisError::InsufficientData {
                len: 20,
                required: 21,
                requirement: "baseline_window"
            })
        );
        assert!(matches!(
            check_length(10, &settings),
            Err(AnalysisError::InsufficientData {
                requirement: "smoothing_window",
                ..
            })
        ));
        let settings = DetectorSettings {
            derivative_window: Some(30),
            ..Default::default()
        };
        assert!(matches!(
            check_length(25, &settings),
            Err(AnalysisError::InsufficientData {
                requirement: "derivative_window",
                ..
            })
        ));
    }

    #[test]
    fn stimuli_are_isolated_individually() {
        let (accepted, failures) = validate_stimuli(&[
            StimulusWindow::new("ATP", 1.0, 3.0),
            StimulusWindow::new("empty", 4.0, 4.0),
            StimulusWindow::new("overlap", 2.5, 5.0),
            StimulusWindow::new("KCL", 6.0, 8.0),
            StimulusWindow::new("nan", Real::NAN, 9.0),
        ]);
        let names: Vec<_> = accepted.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["ATP", "KCL"]);
        let rejected: Vec<_> = failures.iter().map(|f| f.entity.clone()).collect();
        assert_eq!(
            rejected,
            [
                Entity::Stimulus("empty".into()),
                Entity::Stimulus("overlap".into()),
                Entity::Stimulus("nan".into()),
            ]
        );
    }

    #[test]
    fn touching_stimuli_are_accepted() {
        let (accepted, failures) = validate_stimuli(&[
            StimulusWindow::new("ATP", 1.0, 3.0),
            StimulusWindow::new("KCL", 3.0, 5.0),
        ]);
        assert_eq!(accepted.len(), 2);
        assert!(failures.is_empty());
    }

    #[test]
    fn excluded_samples_are_interpolated() {
        let series = series(
            vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
            vec![0.1, 0.2, 9.0, 9.0, 0.5, 0.6],
        );
        let conditioned = condition(&series, &[Interval::new(1.5, 3.5)]);
        let expected = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        for (actual, expected) in conditioned.iter().zip(expected) {
            assert_approx_eq!(actual, expected, 1e-12);
        }
    }

    #[test]
    fn excluded_edges_hold_nearest_value() {
        let series = series(vec![0.0, 1.0, 2.0, 3.0], vec![7.0, 0.2, 0.3, 7.0]);
        let conditioned = condition(
            &series,
            &[Interval::new(-1.0, 0.5), Interval::new(2.5, 4.0)],
        );
        assert_eq!(conditioned, vec![0.2, 0.2, 0.3, 0.3]);
    }

    #[test]
    fn too_few_retained_samples_leave_series_unchanged() {
        let series = series(vec![0.0, 1.0, 2.0], vec![0.1, 0.5, 0.9]);
        assert_eq!(condition(&series, &[Interval::new(0.5, 2.0)]), series.values);
    }

    #[test]
    fn summary() {
        let time: Vec<Real> = (0..121).map(|i| i as Real / 60.0).collect();
        let dataset = Dataset::from_shared_axis(
            &time,
            [("ROI_1".to_owned(), vec![0.1; 121])],
            vec![StimulusWindow::new("ATP", 0.5, 1.0)],
        );
        let summary = DatasetSummary::new(&dataset);
        assert_eq!(summary.num_cells, 1);
        assert_eq!(summary.num_samples, 121);
        assert_approx_eq!(summary.duration, 2.0, 1e-12);
        assert_approx_eq!(summary.sampling_rate_hz, 1.0, 1e-9);
        assert_eq!(summary.stimuli, ["ATP"]);
    }

    #[test]
    fn empty_summary() {
        let summary = DatasetSummary::new(&Dataset::default());
        assert_eq!(summary, DatasetSummary::default());
    }
}
