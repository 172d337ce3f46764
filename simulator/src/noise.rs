use calcium_common::Real;
use rand::{Rng, distr::Uniform};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::SimulationError;

/// Additive, independent noise drawn for every sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "noise-type")]
pub enum NoiseSource {
    Gaussian { sd: Real },
    Uniform { min: Real, max: Real },
}

/// A [NoiseSource] whose parameters have been checked.
#[derive(Debug, Clone)]
pub(crate) enum Noise {
    Gaussian(Normal<Real>),
    Uniform(Uniform<Real>),
}

impl Noise {
    pub(crate) fn new(source: &NoiseSource) -> Result<Self, SimulationError> {
        Ok(match *source {
            NoiseSource::Gaussian { sd } => Self::Gaussian(Normal::new(0.0, sd)?),
            NoiseSource::Uniform { min, max } => Self::Uniform(Uniform::new(min, max)?),
        })
    }

    pub(crate) fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Real {
        match self {
            Self::Gaussian(normal) => normal.sample(rng),
            Self::Uniform(uniform) => uniform.sample(rng),
        }
    }
}
