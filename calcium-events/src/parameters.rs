//! Defines the parameters used by the smoother, the detectors and the refiner.
use crate::{
    error::AnalysisError,
    event_detection::{Real, refine::RefineSettings},
};
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use tracing::warn;

/// Which series the hysteresis detector runs on.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalSource {
    /// The Savitzky-Golay smoothed series.
    #[default]
    Smoothed,
    /// The conditioned, unsmoothed series.
    Raw,
}

/// Which refined mask is handed to the stimulus mapper.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    /// The hysteresis detector's mask.
    #[default]
    Signal,
    /// The derivative detector's mask.
    Derivative,
}

#[derive(Debug, Clone, PartialEq, Args, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    /// Length of the Savitzky-Golay window, in samples. Must be odd.
    #[clap(long, env = "CALCIUM_SMOOTHING_WINDOW", default_value_t = 15)]
    pub smoothing_window: usize,

    /// Order of the polynomial fitted in each smoothing window.
    #[clap(long, env = "CALCIUM_SMOOTHING_ORDER", default_value_t = 3)]
    pub smoothing_order: usize,

    /// Length of the trailing window used for the rolling median and MAD.
    #[clap(long, env = "CALCIUM_BASELINE_WINDOW", default_value_t = 20)]
    pub baseline_window: usize,

    /// Length of the trailing window used to scale the derivative. Defaults to the baseline window.
    #[clap(long, env = "CALCIUM_DERIVATIVE_WINDOW")]
    pub derivative_window: Option<usize>,

    /// Multiple of the dispersion above the baseline that starts an event.
    #[clap(long, env = "CALCIUM_K_UP", default_value_t = 1.65)]
    pub k_up: Real,

    /// Multiple of the dispersion below the baseline that ends an event.
    #[clap(long, env = "CALCIUM_K_DOWN", default_value_t = 1.65)]
    pub k_down: Real,

    /// Damping of baseline updates while an event is in progress, between 0 and 1.
    #[clap(long, env = "CALCIUM_INFLUENCE", default_value_t = 0.95)]
    pub influence: Real,

    /// Events separated by fewer quiet samples than this are merged.
    #[clap(long, env = "CALCIUM_MERGE_GAP", default_value_t = 10)]
    pub merge_gap: usize,

    /// Number of samples examined before an onset when extending it backward.
    #[clap(long, env = "CALCIUM_LOOKBACK", default_value_t = 5)]
    pub lookback: usize,

    /// Number of samples examined after an offset when extending it forward.
    #[clap(long, env = "CALCIUM_LOOKAHEAD", default_value_t = 5)]
    pub lookahead: usize,

    /// Fraction of examined samples which must agree before an extension is accepted.
    #[clap(long, env = "CALCIUM_AGREE_FRACTION", default_value_t = 0.8)]
    pub agree_fraction: Real,

    /// Multiple of the derivative's robust scale which registers a rising or falling sample.
    #[clap(long, env = "CALCIUM_DERIVATIVE_K", default_value_t = 1.65)]
    pub derivative_k: Real,

    /// Lower bound applied to every dispersion before it is used as a threshold.
    #[clap(long, env = "CALCIUM_NOISE_FLOOR", default_value_t = 1e-6)]
    pub noise_floor: Real,

    /// Length of the early part of each response that is integrated separately, in minutes.
    #[clap(long, env = "CALCIUM_EARLY_WINDOW", default_value_t = 1.0)]
    pub early_window: Real,

    /// Series fed to the hysteresis detector.
    #[clap(long, value_enum, default_value_t)]
    pub detection_signal: SignalSource,

    /// Detector whose refined mask is mapped onto the stimuli.
    #[clap(long, value_enum, default_value_t)]
    pub event_source: EventSource,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            smoothing_window: 15,
            smoothing_order: 3,
            baseline_window: 20,
            derivative_window: None,
            k_up: 1.65,
            k_down: 1.65,
            influence: 0.95,
            merge_gap: 10,
            lookback: 5,
            lookahead: 5,
            agree_fraction: 0.8,
            derivative_k: 1.65,
            noise_floor: 1e-6,
            early_window: 1.0,
            detection_signal: SignalSource::default(),
            event_source: EventSource::default(),
        }
    }
}

fn positive(name: &'static str, value: Real) -> Result<(), AnalysisError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AnalysisError::invalid(name, format!("{value} is not positive")))
    }
}

fn unit_interval(name: &'static str, value: Real) -> Result<(), AnalysisError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(AnalysisError::invalid(name, format!("{value} is outside [0, 1]")))
    }
}

fn recommend<T>(name: &str, value: T, range: RangeInclusive<T>)
where
    T: PartialOrd + std::fmt::Display,
{
    if !range.contains(&value) {
        warn!(
            "{name} = {value} is outside the recommended range {}..={}",
            range.start(),
            range.end()
        );
    }
}

impl DetectorSettings {
    pub fn derivative_window(&self) -> usize {
        self.derivative_window.unwrap_or(self.baseline_window)
    }

    pub(crate) fn refinement(&self) -> RefineSettings {
        RefineSettings {
            lookback: self.lookback,
            lookahead: self.lookahead,
            merge_gap: self.merge_gap,
            agree_fraction: self.agree_fraction,
        }
    }

    /// Enforces the hard constraints and warns about values outside the recommended ranges.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.smoothing_window % 2 == 0 {
            return Err(AnalysisError::invalid(
                "smoothing_window",
                format!("{} is not odd", self.smoothing_window),
            ));
        }
        if self.smoothing_order >= self.smoothing_window {
            return Err(AnalysisError::invalid(
                "smoothing_order",
                format!(
                    "{} is not less than the window length {}",
                    self.smoothing_order, self.smoothing_window
                ),
            ));
        }
        for (name, window) in [
            ("baseline_window", self.baseline_window),
            ("derivative_window", self.derivative_window()),
        ] {
            if window < 2 {
                return Err(AnalysisError::invalid(name, format!("{window} is less than 2")));
            }
        }
        positive("k_up", self.k_up)?;
        positive("k_down", self.k_down)?;
        positive("derivative_k", self.derivative_k)?;
        positive("early_window", self.early_window)?;
        unit_interval("influence", self.influence)?;
        unit_interval("agree_fraction", self.agree_fraction)?;
        if !(self.noise_floor.is_finite() && self.noise_floor >= 0.0) {
            return Err(AnalysisError::invalid(
                "noise_floor",
                format!("{} is negative or not finite", self.noise_floor),
            ));
        }

        recommend("smoothing_window", self.smoothing_window, 5..=51);
        recommend("smoothing_order", self.smoothing_order, 2..=5);
        recommend("baseline_window", self.baseline_window, 5..=100);
        recommend("k_up", self.k_up, 0.5..=5.0);
        recommend("k_down", self.k_down, 0.5..=5.0);
        recommend("merge_gap", self.merge_gap, 2..=30);
        recommend("derivative_k", self.derivative_k, 0.5..=5.0);
        Ok(())
    }
}
