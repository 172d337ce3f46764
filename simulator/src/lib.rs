//! Renders synthetic calcium-imaging datasets from a JSON description.
mod noise;
mod pulse;
mod simulation_config;

use calcium_common::{CellId, Real};
use thiserror::Error;

pub use noise::NoiseSource;
pub use pulse::PulseTemplate;
pub use simulation_config::{CellTemplate, SimulationConfig};

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Invalid sample interval: {0}")]
    SampleInterval(Real),
    #[error("Invalid pulse in cell {cell}: {reason}")]
    Pulse { cell: CellId, reason: String },
    #[error("Invalid Normal Distribution: {0}")]
    NormalDistribution(#[from] rand_distr::NormalError),
    #[error("Invalid Uniform Distribution: {0}")]
    UniformDistribution(#[from] rand::distr::uniform::Error),
}
