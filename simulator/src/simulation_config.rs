use crate::{
    SimulationError,
    noise::{Noise, NoiseSource},
    pulse::PulseTemplate,
};
use calcium_common::{CellId, Dataset, Interval, Real, Series, StimulusWindow};
use rand::{SeedableRng, rngs::StdRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// One simulated cell: a drifting baseline, optional noise and any number of pulses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CellTemplate {
    pub id: CellId,
    pub baseline: Real,
    /// Change of the baseline per minute.
    #[serde(default)]
    pub drift: Real,
    #[serde(default)]
    pub noise: Option<NoiseSource>,
    #[serde(default)]
    pub pulses: Vec<PulseTemplate>,
}

impl CellTemplate {
    pub fn new(id: impl Into<CellId>, baseline: Real) -> Self {
        Self {
            id: id.into(),
            baseline,
            drift: 0.0,
            noise: None,
            pulses: Vec::new(),
        }
    }

    pub fn with_drift(self, drift: Real) -> Self {
        Self { drift, ..self }
    }

    pub fn with_noise(self, noise: NoiseSource) -> Self {
        Self {
            noise: Some(noise),
            ..self
        }
    }

    pub fn with_pulse(mut self, pulse: PulseTemplate) -> Self {
        self.pulses.push(pulse);
        self
    }

    fn render(&self, time: &[Real], seed: u64) -> Result<Series, SimulationError> {
        for pulse in &self.pulses {
            pulse.validate().map_err(|reason| SimulationError::Pulse {
                cell: self.id.clone(),
                reason,
            })?;
        }
        let noise = self.noise.as_ref().map(Noise::new).transpose()?;
        let mut rng = StdRng::seed_from_u64(seed);

        let values = time
            .iter()
            .map(|&t| {
                let signal = self.baseline
                    + self.drift * t
                    + self
                        .pulses
                        .iter()
                        .map(|pulse| pulse.value_at(t))
                        .sum::<Real>();
                noise
                    .as_ref()
                    .map(|noise| signal + noise.sample(&mut rng))
                    .unwrap_or(signal)
            })
            .collect();
        Ok(Series::new(self.id.clone(), time.to_vec(), values))
    }
}

/// Describes a synthetic experiment sampled on a uniform time axis starting at zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SimulationConfig {
    /// Minutes between samples.
    pub sample_interval: Real,
    pub num_samples: usize,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub stimuli: Vec<StimulusWindow>,
    #[serde(default)]
    pub exclusions: Vec<Interval>,
    #[serde(default)]
    pub cells: Vec<CellTemplate>,
}

impl SimulationConfig {
    pub fn new(sample_interval: Real, num_samples: usize) -> Self {
        Self {
            sample_interval,
            num_samples,
            seed: 0,
            stimuli: Vec::new(),
            exclusions: Vec::new(),
            cells: Vec::new(),
        }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    pub fn with_stimulus(mut self, name: &str, start: Real, end: Real) -> Self {
        self.stimuli.push(StimulusWindow::new(name, start, end));
        self
    }

    pub fn with_exclusion(mut self, interval: Interval) -> Self {
        self.exclusions.push(interval);
        self
    }

    pub fn with_cell(mut self, cell: CellTemplate) -> Self {
        self.cells.push(cell);
        self
    }

    pub fn time_axis(&self) -> Vec<Real> {
        (0..self.num_samples)
            .map(|i| i as Real * self.sample_interval)
            .collect()
    }

    /// Renders every cell. Cell `i` draws its noise from a generator seeded
    /// with `seed + i`, so identical configurations give identical datasets.
    #[tracing::instrument(skip_all, fields(num_cells = self.cells.len()))]
    pub fn generate(&self) -> Result<Dataset, SimulationError> {
        if !(self.sample_interval.is_finite() && self.sample_interval > 0.0) {
            return Err(SimulationError::SampleInterval(self.sample_interval));
        }
        let time = self.time_axis();
        let cells = self
            .cells
            .par_iter()
            .enumerate()
            .map(|(index, cell)| cell.render(&time, self.seed.wrapping_add(index as u64)))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!("Generated {} cells of {} samples", cells.len(), time.len());

        Ok(Dataset::new(cells, self.stimuli.clone()).with_exclusions(self.exclusions.clone()))
    }
}
