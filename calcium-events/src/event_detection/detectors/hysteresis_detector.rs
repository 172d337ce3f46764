use super::{Detection, Detector};
use crate::{
    error::AnalysisError,
    event_detection::{
        EventLabel, Evidence, Real,
        window::{Centre, RobustEstimate, RobustWindow, Window, check_window},
    },
    parameters::DetectorSettings,
};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    #[default]
    Quiet,
    Active,
}

/// Classifies samples against an adaptive band around the rolling median.
///
/// An event starts when a sample exceeds `baseline + k_up * dispersion` and
/// ends when a sample drops below `baseline - k_down * dispersion`, where the
/// baseline and dispersion are those of the window before the sample enters
/// it. No sample is classified until the window holds `window_length`
/// samples; the reported traces still cover the warm-up. From the onset sample until the offset sample, each sample enters the
/// rolling window only as the fraction `1 - influence` of its step from the
/// previously entered value, so the baseline does not follow the response
/// upward. The reported traces are taken after each sample has entered.
#[derive(Debug, Clone, PartialEq)]
pub struct HysteresisDetector {
    window_length: usize,
    k_up: Real,
    k_down: Real,
    influence: Real,
    noise_floor: Real,
}

impl HysteresisDetector {
    pub fn new(
        window_length: usize,
        k_up: Real,
        k_down: Real,
        influence: Real,
    ) -> Result<Self, AnalysisError> {
        for (name, k) in [("k_up", k_up), ("k_down", k_down)] {
            if !(k.is_finite() && k > 0.0) {
                return Err(AnalysisError::invalid(name, format!("{k} is not positive")));
            }
        }
        if !(0.0..=1.0).contains(&influence) {
            return Err(AnalysisError::invalid(
                "influence",
                format!("{influence} is outside [0, 1]"),
            ));
        }
        Ok(Self {
            window_length,
            k_up,
            k_down,
            influence,
            noise_floor: 0.0,
        })
    }

    /// Dispersions below `noise_floor` are raised to it before being compared.
    pub fn with_noise_floor(self, noise_floor: Real) -> Self {
        Self {
            noise_floor,
            ..self
        }
    }

    fn scale(&self, estimate: &RobustEstimate) -> Real {
        estimate.dispersion.max(self.noise_floor)
    }

    pub fn from_settings(settings: &DetectorSettings) -> Result<Self, AnalysisError> {
        Ok(Self::new(
            settings.baseline_window,
            settings.k_up,
            settings.k_down,
            settings.influence,
        )?
        .with_noise_floor(settings.noise_floor))
    }
}

/// The per-sample state machine driven by [HysteresisDetector::detect].
#[derive(Debug, Clone)]
struct HysteresisState<'a> {
    detector: &'a HysteresisDetector,
    window: RobustWindow,
    state: State,
}

impl<'a> HysteresisState<'a> {
    fn new(detector: &'a HysteresisDetector) -> Self {
        Self {
            detector,
            window: RobustWindow::new(detector.window_length, Centre::Median),
            state: State::Quiet,
        }
    }

    fn signal(&mut self, value: Real) -> (EventLabel, RobustEstimate) {
        let detector = self.detector;
        let history = self.window.output().filter(|_| self.window.is_full());
        let label = match (self.state, history) {
            (State::Quiet, Some(estimate))
                if value > estimate.baseline + detector.k_up * detector.scale(&estimate) =>
            {
                self.state = State::Active;
                EventLabel::Rising
            }
            (State::Active, Some(estimate))
                if value < estimate.baseline - detector.k_down * detector.scale(&estimate) =>
            {
                self.state = State::Quiet;
                EventLabel::Falling
            }
            _ => EventLabel::Quiet,
        };

        let entered = match (self.state, self.window.latest()) {
            (State::Active, Some(previous)) => {
                previous + (1.0 - detector.influence) * (value - previous)
            }
            _ => value,
        };
        self.window.push(entered);
        (label, self.window.output().unwrap_or_default())
    }
}

impl Detector for HysteresisDetector {
    fn detect(&self, _time: &[Real], values: &[Real]) -> Result<Detection, AnalysisError> {
        check_window(values.len(), self.window_length, "baseline_window")?;

        let mut state = HysteresisState::new(self);
        let mut mask = Vec::with_capacity(values.len());
        let mut baseline = Vec::with_capacity(values.len());
        let mut dispersion = Vec::with_capacity(values.len());
        for &value in values {
            let (label, estimate) = state.signal(value);
            mask.push(label);
            baseline.push(estimate.baseline);
            dispersion.push(estimate.dispersion);
        }

        Ok(Detection {
            mask: mask.into(),
            evidence: Evidence::Level(values.to_vec()),
            baseline,
            dispersion,
        })
    }
}
