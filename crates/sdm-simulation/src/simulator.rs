//! Regime-switching signal simulator with ground-truth labels

use crate::regimes::{presets, RegimeSpec};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use sdm_core::{LabelSequence, SdmError, SdmResult, Signal};
use serde::{Deserialize, Serialize};

/// Configuration for regime simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Sampling rate in Hz
    pub sampling_rate: f64,
    /// Regimes to switch between
    pub regimes: Vec<RegimeSpec>,
    /// Shortest stay in a regime (samples)
    pub min_dwell: usize,
    /// Longest stay in a regime (samples)
    pub max_dwell: usize,
    /// Artifact configuration
    pub artifacts: ArtifactConfig,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

/// Transient artifacts layered on top of the regimes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Per-sample probability of a spike
    pub spike_probability: f64,
    /// Spike amplitude (sign is random)
    pub spike_amplitude: f64,
    /// Linear baseline drift added per sample
    pub drift_per_sample: f64,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            spike_probability: 0.005,
            spike_amplitude: 8.0,
            drift_per_sample: 0.0002,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sampling_rate: 250.0,
            regimes: vec![RegimeSpec::new(0.0, 0.2), RegimeSpec::new(2.0, 0.3)],
            min_dwell: 50,
            max_dwell: 300,
            artifacts: ArtifactConfig::default(),
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Configuration using a named regime preset
    pub fn from_preset(name: &str) -> SdmResult<Self> {
        let regimes = presets()
            .into_iter()
            .find(|(preset, _)| *preset == name)
            .map(|(_, regimes)| regimes)
            .ok_or_else(|| SdmError::SimulationError {
                message: format!("Unknown regime preset '{}'", name),
            })?;

        Ok(Self {
            regimes,
            ..Self::default()
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> SdmResult<()> {
        if self.sampling_rate <= 0.0 || !self.sampling_rate.is_finite() {
            return Err(SdmError::SimulationError {
                message: format!("Sampling rate must be positive, got {}", self.sampling_rate),
            });
        }
        if self.regimes.is_empty() {
            return Err(SdmError::SimulationError {
                message: "At least one regime is required".to_string(),
            });
        }
        if self.min_dwell == 0 || self.min_dwell > self.max_dwell {
            return Err(SdmError::SimulationError {
                message: format!(
                    "Dwell range {}..={} is invalid",
                    self.min_dwell, self.max_dwell
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.artifacts.spike_probability) {
            return Err(SdmError::SimulationError {
                message: "Spike probability must be between 0.0 and 1.0".to_string(),
            });
        }
        Ok(())
    }
}

/// Simulated signal with the regime that produced each sample
#[derive(Debug, Clone)]
pub struct SimulatedRecording {
    pub signal: Signal,
    pub labels: LabelSequence,
    /// Indices where a spike artifact was injected
    pub spike_indices: Vec<usize>,
}

/// Regime-switching signal simulator
pub struct RegimeSimulator {
    config: SimulationConfig,
    rng: StdRng,
    noise: Vec<Normal<f64>>,
}

impl RegimeSimulator {
    /// Create new simulator with configuration
    pub fn new(config: SimulationConfig) -> SdmResult<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let noise = config
            .regimes
            .iter()
            .map(|regime| {
                Normal::new(regime.mean, regime.std_dev).map_err(|e| SdmError::SimulationError {
                    message: format!("Failed to create normal distribution: {}", e),
                })
            })
            .collect::<SdmResult<Vec<_>>>()?;

        Ok(RegimeSimulator { config, rng, noise })
    }

    /// Generate `n_samples` samples
    pub fn generate(&mut self, n_samples: usize) -> SdmResult<SimulatedRecording> {
        if n_samples == 0 {
            return Err(SdmError::SimulationError {
                message: "Cannot generate an empty recording".to_string(),
            });
        }

        let n_regimes = self.config.regimes.len();
        let mut samples = Vec::with_capacity(n_samples);
        let mut labels = Vec::with_capacity(n_samples);
        let mut spike_indices = Vec::new();

        let mut regime = self.rng.gen_range(0..n_regimes);
        let mut remaining = self.draw_dwell();

        for index in 0..n_samples {
            if remaining == 0 {
                regime = self.next_regime(regime);
                remaining = self.draw_dwell();
            }
            remaining -= 1;

            let mut value = self.noise[regime].sample(&mut self.rng);

            // Slow baseline drift
            value += self.config.artifacts.drift_per_sample * index as f64;

            // Motion artifacts (random spikes)
            if self.rng.gen::<f64>() < self.config.artifacts.spike_probability {
                let sign = if self.rng.gen::<bool>() { 1.0 } else { -1.0 };
                value += sign * self.config.artifacts.spike_amplitude;
                spike_indices.push(index);
            }

            samples.push(value);
            labels.push(regime);
        }

        Ok(SimulatedRecording {
            signal: Signal::new(samples, self.config.sampling_rate)?,
            labels: LabelSequence::new(labels, n_regimes)?,
            spike_indices,
        })
    }

    /// Get current configuration
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    fn draw_dwell(&mut self) -> usize {
        self.rng.gen_range(self.config.min_dwell..=self.config.max_dwell)
    }

    /// Pick a different regime uniformly; stays put with a single regime
    fn next_regime(&mut self, current: usize) -> usize {
        let n_regimes = self.config.regimes.len();
        if n_regimes == 1 {
            return current;
        }
        let offset = self.rng.gen_range(1..n_regimes);
        (current + offset) % n_regimes
    }
}
