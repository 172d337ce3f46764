use super::{Detection, Detector};
use crate::{
    error::AnalysisError,
    event_detection::{
        EventLabel, Evidence, Real,
        window::{derivative, track_scale},
    },
    parameters::DetectorSettings,
};

/// Classifies samples by the slope of the series, scaled by the rolling MAD
/// of the slope about zero.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivativeDetector {
    window_length: usize,
    k: Real,
    noise_floor: Real,
}

impl DerivativeDetector {
    pub fn new(window_length: usize, k: Real) -> Result<Self, AnalysisError> {
        if !(k.is_finite() && k > 0.0) {
            return Err(AnalysisError::invalid(
                "derivative_k",
                format!("{k} is not positive"),
            ));
        }
        Ok(Self {
            window_length,
            k,
            noise_floor: 0.0,
        })
    }

    /// Scales below `noise_floor` are raised to it before being compared.
    pub fn with_noise_floor(self, noise_floor: Real) -> Self {
        Self {
            noise_floor,
            ..self
        }
    }

    pub fn from_settings(settings: &DetectorSettings) -> Result<Self, AnalysisError> {
        Ok(Self::new(settings.derivative_window(), settings.derivative_k)?
            .with_noise_floor(settings.noise_floor))
    }
}

impl Detector for DerivativeDetector {
    fn detect(&self, time: &[Real], values: &[Real]) -> Result<Detection, AnalysisError> {
        let slopes = derivative(time, values)?;
        let scale = track_scale(&slopes, self.window_length)?;

        let mask = slopes
            .iter()
            .zip(&scale)
            .map(|(&slope, &scale)| {
                let threshold = self.k * scale.max(self.noise_floor);
                if slope > threshold {
                    EventLabel::Rising
                } else if slope < -threshold {
                    EventLabel::Falling
                } else {
                    EventLabel::Quiet
                }
            })
            .collect();

        Ok(Detection {
            mask,
            baseline: vec![0.0; slopes.len()],
            dispersion: scale,
            evidence: Evidence::Slope(slopes),
        })
    }
}
