use calcium_common::Real;
use serde::{Deserialize, Serialize};

/// The shape of one simulated response, added on top of the cell's baseline.
/// All times are in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "pulse-type")]
pub enum PulseTemplate {
    /// `height` on `[start, start + width)`.
    #[serde(rename_all = "kebab-case")]
    Flat { start: Real, width: Real, height: Real },
    /// Rises linearly from `start` to `height` at `peak_time`, then falls
    /// linearly back to zero at `start + width`.
    #[serde(rename_all = "kebab-case")]
    Triangular {
        start: Real,
        peak_time: Real,
        width: Real,
        height: Real,
    },
    #[serde(rename_all = "kebab-case")]
    Gaussian { peak_time: Real, sd: Real, height: Real },
    /// Difference of exponentials starting at `start`, scaled so that its
    /// maximum is `height`. `decay` must exceed `rise`.
    #[serde(rename_all = "kebab-case")]
    Biexp {
        start: Real,
        rise: Real,
        decay: Real,
        height: Real,
    },
}

impl PulseTemplate {
    /// Describes the first inconsistency in the template, if any.
    pub(crate) fn validate(&self) -> Result<(), String> {
        match *self {
            Self::Flat { width, .. } if !(width.is_finite() && width > 0.0) => {
                Err(format!("width {width} is not positive"))
            }
            Self::Triangular {
                start,
                peak_time,
                width,
                ..
            } if !(start < peak_time && peak_time < start + width) => Err(format!(
                "peak time {peak_time} does not lie strictly inside [{start}, {}]",
                start + width
            )),
            Self::Gaussian { sd, .. } if !(sd.is_finite() && sd > 0.0) => {
                Err(format!("sd {sd} is not positive"))
            }
            Self::Biexp { rise, decay, .. } if !(0.0 < rise && rise < decay) => Err(format!(
                "rise {rise} and decay {decay} do not satisfy 0 < rise < decay"
            )),
            _ => Ok(()),
        }
    }

    pub fn value_at(&self, time: Real) -> Real {
        match *self {
            Self::Flat {
                start,
                width,
                height,
            } => {
                if start <= time && time < start + width {
                    height
                } else {
                    Real::default()
                }
            }
            Self::Triangular {
                start,
                peak_time,
                width,
                height,
            } => {
                let stop = start + width;
                if start <= time && time <= peak_time {
                    height * (time - start) / (peak_time - start)
                } else if peak_time < time && time <= stop {
                    height * (stop - time) / (stop - peak_time)
                } else {
                    Real::default()
                }
            }
            Self::Gaussian {
                peak_time,
                sd,
                height,
            } => height * Real::exp(-0.5 * Real::powi((time - peak_time) / sd, 2)),
            Self::Biexp {
                start,
                rise,
                decay,
                height,
            } => {
                if time < start {
                    return Real::default();
                }
                /*
                f(t) = e^{-t/d} - e^{-t/r}
                f'(t) = 0 at t' = ln(d/r) dr/(d - r)
                */
                let shape = |t: Real| Real::exp(-t / decay) - Real::exp(-t / rise);
                let peak_time = Real::ln(decay / rise) * decay * rise / (decay - rise);
                height * shape(time - start) / shape(peak_time)
            }
        }
    }
}
