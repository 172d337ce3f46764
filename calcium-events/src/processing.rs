use crate::{
    dataset::{DatasetSummary, check_length, condition, validate_series, validate_stimuli},
    error::{AnalysisError, Entity, FailureReport},
    event_detection::{
        DerivativeDetector, Detector, EventMask, HysteresisDetector, Real, RefineSettings,
        SaveToFileFilter, SavitzkyGolay, refine,
    },
    mapping::map_events,
    metrics,
    parameters::{DetectorSettings, EventSource, SignalSource},
    response::{EventRecord, measure},
};
use calcium_common::{CellId, Dataset, Interval, Series, StimulusWindow};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Every intermediate series derived from one cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellAnalysis {
    pub cell_id: CellId,
    /// The series after exclusion intervals were bridged.
    pub conditioned: Vec<Real>,
    pub smoothed: Vec<Real>,
    pub baseline: Vec<Real>,
    pub dispersion: Vec<Real>,
    pub derivative: Vec<Real>,
    pub derivative_scale: Vec<Real>,
    pub signal_mask: EventMask,
    pub derivative_mask: EventMask,
    pub refined_signal_mask: EventMask,
    pub refined_derivative_mask: EventMask,
}

impl CellAnalysis {
    /// The refined mask selected by `source`.
    pub fn refined(&self, source: EventSource) -> &EventMask {
        match source {
            EventSource::Signal => &self.refined_signal_mask,
            EventSource::Derivative => &self.refined_derivative_mask,
        }
    }
}

/// Response counts for one stimulus over the successfully analysed cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StimulusResponseSummary {
    pub stimulus_name: String,
    pub analysed: usize,
    pub responding: usize,
    pub response_rate: Real,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub settings: DetectorSettings,
    pub summary: DatasetSummary,
    /// One entry per cell that was analysed, in input order.
    pub cells: Vec<CellAnalysis>,
    /// One record per (analysed cell, accepted stimulus), cell-major.
    pub records: Vec<EventRecord>,
    pub responses: Vec<StimulusResponseSummary>,
    /// Rejected stimuli first, then failed cells in input order.
    pub failures: Vec<FailureReport>,
}

/// The stages shared by every cell of one analysis.
struct Pipeline<'a> {
    settings: &'a DetectorSettings,
    smoother: SavitzkyGolay,
    signal_detector: HysteresisDetector,
    derivative_detector: DerivativeDetector,
    refinement: RefineSettings,
}

impl<'a> Pipeline<'a> {
    fn new(settings: &'a DetectorSettings) -> Result<Self, AnalysisError> {
        Ok(Self {
            settings,
            smoother: SavitzkyGolay::new(settings.smoothing_window, settings.smoothing_order)?,
            signal_detector: HysteresisDetector::from_settings(settings)?,
            derivative_detector: DerivativeDetector::from_settings(settings)?,
            refinement: settings.refinement(),
        })
    }

    #[tracing::instrument(skip_all, fields(cell = %series.id, num_events))]
    fn process_cell(
        &self,
        series: &Series,
        exclusions: &[Interval],
        stimuli: &[StimulusWindow],
    ) -> Result<(CellAnalysis, Vec<EventRecord>), AnalysisError> {
        validate_series(series, exclusions)?;
        check_length(series.len(), self.settings)?;

        let conditioned = condition(series, exclusions);
        let smoothed = self.smoother.apply(&conditioned)?;
        let signal = match self.settings.detection_signal {
            SignalSource::Smoothed => &smoothed,
            SignalSource::Raw => &conditioned,
        };

        let signal_detection = self.signal_detector.detect(&series.time, signal)?;
        let derivative_detection = self.derivative_detector.detect(&series.time, &smoothed)?;
        let refined_signal_mask = refine(&signal_detection, &self.refinement);
        let refined_derivative_mask = refine(&derivative_detection, &self.refinement);

        let analysis = CellAnalysis {
            cell_id: series.id.clone(),
            conditioned,
            smoothed,
            baseline: signal_detection.baseline,
            dispersion: signal_detection.dispersion,
            derivative: derivative_detection.evidence.values().to_vec(),
            derivative_scale: derivative_detection.dispersion,
            signal_mask: signal_detection.mask,
            derivative_mask: derivative_detection.mask,
            refined_signal_mask,
            refined_derivative_mask,
        };

        let mask = analysis.refined(self.settings.event_source);
        tracing::Span::current().record("num_events", mask.num_onsets());

        let records = map_events(&series.time, mask, stimuli)
            .into_iter()
            .zip(stimuli)
            .map(|(event, stimulus)| {
                let response = event.and_then(|event| {
                    measure(
                        &series.time,
                        &analysis.conditioned,
                        &event,
                        self.settings.early_window,
                    )
                });
                if response.is_none() {
                    debug!("No response to {}", stimulus.name);
                }
                EventRecord {
                    cell_id: series.id.clone(),
                    stimulus_name: stimulus.name.clone(),
                    response,
                }
            })
            .collect();
        Ok((analysis, records))
    }
}

fn summarise_responses(
    stimuli: &[StimulusWindow],
    records: &[EventRecord],
) -> Vec<StimulusResponseSummary> {
    stimuli
        .iter()
        .enumerate()
        .map(|(k, stimulus)| {
            let (analysed, responding) = records
                .iter()
                .skip(k)
                .step_by(stimuli.len())
                .fold((0, 0), |(analysed, responding), record| {
                    (analysed + 1, responding + usize::from(record.is_response()))
                });
            StimulusResponseSummary {
                stimulus_name: stimulus.name.clone(),
                analysed,
                responding,
                response_rate: if analysed == 0 {
                    0.0
                } else {
                    responding as Real / analysed as Real
                },
            }
        })
        .collect()
}

/// Runs the full pipeline over every cell of `dataset`.
///
/// Invalid settings fail the whole call before any data is touched. Malformed
/// cells and stimulus windows, and cells too short for the configured windows,
/// are isolated into [AnalysisResult::failures] and the rest of the batch
/// proceeds. The result depends only on the inputs.
#[tracing::instrument(skip_all, fields(num_cells = dataset.cells.len()))]
pub fn analyze(
    dataset: &Dataset,
    settings: &DetectorSettings,
) -> Result<AnalysisResult, AnalysisError> {
    settings.validate()?;
    let pipeline = Pipeline::new(settings)?;
    let (stimuli, mut failures) = validate_stimuli(&dataset.stimuli);

    let outcomes: Vec<_> = dataset
        .cells
        .par_iter()
        .map(|series| pipeline.process_cell(series, &dataset.exclusions, &stimuli))
        .collect();

    let mut cells = Vec::with_capacity(outcomes.len());
    let mut records = Vec::with_capacity(outcomes.len() * stimuli.len());
    for (series, outcome) in dataset.cells.iter().zip(outcomes) {
        match outcome {
            Ok((analysis, cell_records)) => {
                metrics::record_cell(&cell_records);
                cells.push(analysis);
                records.extend(cell_records);
            }
            Err(error) => {
                let report = FailureReport::new(Entity::Cell(series.id.clone()), &error)
                    .ok_or_else(|| error.clone())?;
                warn!("Cell {} failed: {error}", series.id);
                failures.push(report);
            }
        }
    }
    failures.iter().for_each(metrics::record_failure);

    Ok(AnalysisResult {
        settings: settings.clone(),
        summary: DatasetSummary::new(dataset),
        responses: summarise_responses(&stimuli, &records),
        cells,
        records,
        failures,
    })
}

pub fn get_save_file_name(path: &Path, cell_id: &str, kind: &str) -> PathBuf {
    path.join(format!("{cell_id}_{kind}.csv"))
}

/// Writes each diagnostic trace of `analysis` as `time,value` lines under `save_path`.
pub fn save_cell_traces(
    save_path: &Path,
    series: &Series,
    analysis: &CellAnalysis,
) -> std::io::Result<()> {
    let file_name = |kind: &str| get_save_file_name(save_path, &analysis.cell_id, kind);
    let time = series.time.iter().copied();

    for (kind, values) in [
        ("raw", &series.values),
        ("smoothed", &analysis.smoothed),
        ("baseline", &analysis.baseline),
        ("dispersion", &analysis.dispersion),
    ] {
        time.clone()
            .zip(values.iter().copied())
            .save_to_file(&file_name(kind))?;
    }
    for (kind, mask) in [
        ("signal_events", &analysis.refined_signal_mask),
        ("derivative_events", &analysis.refined_derivative_mask),
    ] {
        time.clone()
            .zip(mask.labels().iter().copied())
            .save_to_file(&file_name(kind))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_detection::EventLabel;
    use assert_approx_eq::assert_approx_eq;
    use calcium_common::metrics::failures::FailureKind;
    use simulator::{CellTemplate, NoiseSource, PulseTemplate, SimulationConfig};

    const SAMPLE_INTERVAL: Real = 0.25;
    const NUM_SAMPLES: usize = 200;

    fn triangle(start: Real) -> PulseTemplate {
        PulseTemplate::Triangular {
            start,
            peak_time: start + 2.5,
            width: 5.0,
            height: 0.4,
        }
    }

    fn simulation() -> SimulationConfig {
        SimulationConfig::new(SAMPLE_INTERVAL, NUM_SAMPLES).with_stimulus("ATP", 20.0, 45.0)
    }

    fn responses(result: &AnalysisResult) -> Vec<&crate::response::EventResponse> {
        result
            .records
            .iter()
            .filter_map(|record| record.response.as_ref())
            .collect()
    }

    fn num_rising_runs(mask: &EventMask) -> usize {
        mask.runs()
            .iter()
            .filter(|run| run.label == EventLabel::Rising)
            .count()
    }

    #[test]
    fn flat_baseline_has_no_events() {
        let dataset = SimulationConfig::new(SAMPLE_INTERVAL, NUM_SAMPLES)
            .with_stimulus("ATP", 5.0, 40.0)
            .with_cell(CellTemplate::new("ROI_1", 0.1))
            .generate()
            .unwrap();
        let result = analyze(&dataset, &DetectorSettings::default()).unwrap();

        assert!(result.failures.is_empty());
        let cell = result.cells.first().unwrap();
        assert_eq!(cell.signal_mask.num_onsets(), 0);
        assert_eq!(cell.derivative_mask.num_onsets(), 0);
        assert_eq!(result.records.len(), 1);
        assert!(responses(&result).is_empty());
        assert_eq!(
            result.responses,
            vec![StimulusResponseSummary {
                stimulus_name: "ATP".into(),
                analysed: 1,
                responding: 0,
                response_rate: 0.0,
            }]
        );
    }

    #[test]
    fn single_pulse_is_one_event() {
        let dataset = simulation()
            .with_cell(CellTemplate::new("ROI_1", 0.1).with_pulse(triangle(25.0)))
            .generate()
            .unwrap();
        let result = analyze(&dataset, &DetectorSettings::default()).unwrap();

        let cell = result.cells.first().unwrap();
        assert_eq!(num_rising_runs(&cell.refined_signal_mask), 1);

        let found = responses(&result);
        assert_eq!(found.len(), 1);
        let response = found[0];
        assert!(response.start_time <= 25.0);
        assert!(response.end_time >= 30.0);
        assert!(!response.truncated);
        assert_approx_eq!(response.auc, 1.0, 0.05);
        assert_approx_eq!(response.peak, 0.4, 0.02);
        assert!(response.auc_first_minute < response.auc);
        assert_approx_eq!(response.duration, response.end_time - response.start_time);
        assert_eq!(result.responses[0].response_rate, 1.0);
    }

    #[test]
    fn nearby_pulses_are_merged() {
        let dataset = simulation()
            .with_cell(
                CellTemplate::new("ROI_1", 0.1)
                    .with_pulse(triangle(25.0))
                    .with_pulse(triangle(31.0)),
            )
            .generate()
            .unwrap();
        let result = analyze(&dataset, &DetectorSettings::default()).unwrap();

        let cell = result.cells.first().unwrap();
        assert_eq!(num_rising_runs(&cell.signal_mask), 2);
        assert_eq!(num_rising_runs(&cell.refined_signal_mask), 1);

        let found = responses(&result);
        assert_eq!(found.len(), 1);
        assert!(found[0].start_time <= 25.0);
        assert!(found[0].end_time >= 36.0);
        assert_approx_eq!(found[0].auc, 2.0, 0.1);
    }

    #[test]
    fn merging_can_be_disabled() {
        let dataset = simulation()
            .with_cell(
                CellTemplate::new("ROI_1", 0.1)
                    .with_pulse(triangle(25.0))
                    .with_pulse(triangle(31.0)),
            )
            .generate()
            .unwrap();
        let settings = DetectorSettings {
            merge_gap: 0,
            ..Default::default()
        };
        let result = analyze(&dataset, &settings).unwrap();
        let cell = result.cells.first().unwrap();
        assert_eq!(num_rising_runs(&cell.refined_signal_mask), 2);
    }

    #[test]
    fn event_starts_at_onset_not_at_stimulus() {
        let dataset = SimulationConfig::new(SAMPLE_INTERVAL, NUM_SAMPLES)
            .with_stimulus("ATP", 3.0, 20.0)
            .with_cell(CellTemplate::new("ROI_1", 0.1).with_pulse(PulseTemplate::Flat {
                start: 5.0,
                width: 4.0,
                height: 0.4,
            }))
            .generate()
            .unwrap();
        let settings = DetectorSettings {
            detection_signal: SignalSource::Raw,
            ..Default::default()
        };
        let result = analyze(&dataset, &settings).unwrap();

        let found = responses(&result);
        assert_eq!(found.len(), 1);
        assert_approx_eq!(found[0].start_time, 5.0, 1e-12);
        assert!(found[0].start_time > 3.0);
    }

    #[test]
    fn derivative_event_source() {
        let dataset = simulation()
            .with_cell(CellTemplate::new("ROI_1", 0.1).with_pulse(triangle(25.0)))
            .generate()
            .unwrap();
        let settings = DetectorSettings {
            event_source: EventSource::Derivative,
            ..Default::default()
        };
        let result = analyze(&dataset, &settings).unwrap();

        let cell = result.cells.first().unwrap();
        assert!(cell.refined(EventSource::Derivative).num_onsets() > 0);
        assert_eq!(cell.derivative.len(), NUM_SAMPLES);
        let found = responses(&result);
        assert_eq!(found.len(), 1);
        assert!(found[0].start_time <= 25.0);
    }

    fn noisy_dataset() -> Dataset {
        let noise = NoiseSource::Gaussian { sd: 0.01 };
        simulation()
            .with_seed(7)
            .with_stimulus("KCL", 50.0, 55.0)
            .with_cell(
                CellTemplate::new("ROI_1", 0.1)
                    .with_noise(noise)
                    .with_pulse(triangle(25.0)),
            )
            .with_cell(
                CellTemplate::new("ROI_2", 0.2)
                    .with_drift(-0.001)
                    .with_noise(noise),
            )
            .with_cell(
                CellTemplate::new("ROI_3", 0.15)
                    .with_noise(noise)
                    .with_pulse(triangle(27.0))
                    .with_pulse(triangle(40.0)),
            )
            .generate()
            .unwrap()
    }

    #[test]
    fn repeated_runs_are_identical() {
        let dataset = noisy_dataset();
        let settings = DetectorSettings::default();
        let first = analyze(&dataset, &settings).unwrap();
        let second = analyze(&dataset, &settings).unwrap();
        assert_eq!(first, second);

        let single_threaded = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap()
            .install(|| analyze(&dataset, &settings))
            .unwrap();
        assert_eq!(first, single_threaded);
    }

    #[test]
    fn records_follow_input_order() {
        let result = analyze(&noisy_dataset(), &DetectorSettings::default()).unwrap();
        let keys: Vec<_> = result
            .records
            .iter()
            .map(|record| (record.cell_id.as_str(), record.stimulus_name.as_str()))
            .collect();
        assert_eq!(
            keys,
            [
                ("ROI_1", "ATP"),
                ("ROI_1", "KCL"),
                ("ROI_2", "ATP"),
                ("ROI_2", "KCL"),
                ("ROI_3", "ATP"),
                ("ROI_3", "KCL"),
            ]
        );
        assert!(result.responses.iter().all(|summary| summary.analysed == 3));
    }

    #[test]
    fn failures_are_isolated() {
        let mut dataset = simulation()
            .with_stimulus("late", 50.0, 40.0)
            .with_cell(CellTemplate::new("ROI_1", 0.1).with_pulse(triangle(25.0)))
            .generate()
            .unwrap();
        let time: Vec<Real> = (0..10).map(|i| i as Real * SAMPLE_INTERVAL).collect();
        dataset
            .cells
            .push(Series::new("short", time, vec![0.1; 10]));
        let mut values = vec![0.1; NUM_SAMPLES];
        values[50] = Real::NAN;
        let mut corrupted = dataset.cells.first().unwrap().with_values(values);
        corrupted.id = "nan".into();
        dataset.cells.push(corrupted);

        let result = analyze(&dataset, &DetectorSettings::default()).unwrap();

        let failed: Vec<_> = result
            .failures
            .iter()
            .map(|failure| (failure.entity.clone(), failure.kind))
            .collect();
        assert_eq!(
            failed,
            [
                (Entity::Stimulus("late".into()), FailureKind::MalformedInput),
                (Entity::Cell("short".into()), FailureKind::InsufficientData),
                (Entity::Cell("nan".into()), FailureKind::MalformedInput),
            ]
        );
        assert_eq!(result.cells.len(), 1);
        assert_eq!(result.records.len(), 1);
        assert_eq!(responses(&result).len(), 1);
        assert_eq!(result.responses.len(), 1);
        assert_eq!(result.responses[0].analysed, 1);
        assert_eq!(result.summary.num_cells, 3);
    }

    #[test]
    fn invalid_settings_fail_the_whole_call() {
        let dataset = simulation()
            .with_cell(CellTemplate::new("ROI_1", 0.1))
            .generate()
            .unwrap();
        let settings = DetectorSettings {
            smoothing_window: 14,
            ..Default::default()
        };
        assert!(matches!(
            analyze(&dataset, &settings),
            Err(AnalysisError::InvalidParameter {
                name: "smoothing_window",
                ..
            })
        ));
    }

    #[test]
    fn excluded_artefacts_are_not_events() {
        let artefact = simulation().with_cell(CellTemplate::new("ROI_1", 0.1).with_pulse(
            PulseTemplate::Flat {
                start: 30.0,
                width: 1.0,
                height: 1.0,
            },
        ));
        let settings = DetectorSettings::default();

        let unexcluded = analyze(&artefact.generate().unwrap(), &settings).unwrap();
        assert_eq!(responses(&unexcluded).len(), 1);

        let excluded = artefact
            .with_exclusion(Interval::new(29.9, 31.1))
            .generate()
            .unwrap();
        let result = analyze(&excluded, &settings).unwrap();
        assert!(responses(&result).is_empty());
        let cell = result.cells.first().unwrap();
        for value in &cell.conditioned {
            assert_approx_eq!(value, 0.1, 1e-12);
        }
    }

    #[test]
    fn dropped_frames_inside_exclusions_are_bridged() {
        let mut dataset = simulation()
            .with_cell(CellTemplate::new("ROI_1", 0.1))
            .with_exclusion(Interval::new(29.9, 30.1))
            .generate()
            .unwrap();
        let dropped = dataset.cells.first_mut().unwrap();
        dropped.values[120] = Real::NAN;

        let result = analyze(&dataset, &DetectorSettings::default()).unwrap();
        assert!(result.failures.is_empty());
        let cell = result.cells.first().unwrap();
        assert_eq!(cell.cell_id, "ROI_1");
        assert_approx_eq!(cell.conditioned[120], 0.1, 1e-12);
        assert!(responses(&result).is_empty());
    }

    #[test]
    fn save_file_names() {
        assert_eq!(
            get_save_file_name(Path::new("out"), "ROI_1", "smoothed"),
            Path::new("out").join("ROI_1_smoothed.csv")
        );
    }

    #[test]
    fn traces_are_saved_per_cell() {
        let dataset = simulation()
            .with_cell(CellTemplate::new("ROI_1", 0.1).with_pulse(triangle(25.0)))
            .generate()
            .unwrap();
        let result = analyze(&dataset, &DetectorSettings::default()).unwrap();
        let save_path = std::env::temp_dir().join("calcium-events-save-traces");
        std::fs::create_dir_all(&save_path).unwrap();

        let series = dataset.cells.first().unwrap();
        save_cell_traces(&save_path, series, result.cells.first().unwrap()).unwrap();

        let raw = std::fs::read_to_string(get_save_file_name(&save_path, "ROI_1", "raw")).unwrap();
        assert_eq!(raw.lines().count(), NUM_SAMPLES);
        assert_eq!(raw.lines().next(), Some("0,0.1"));
        let events =
            std::fs::read_to_string(get_save_file_name(&save_path, "ROI_1", "signal_events"))
                .unwrap();
        assert!(events.lines().any(|line| line.ends_with(",1")));
    }
}
