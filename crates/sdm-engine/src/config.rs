//! Configuration management for the state-discovery engine

use crate::backend::{create_backend, BackendKind, ExecutionBackend};
use sdm_core::{config_error, SdmResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default number of mixture components
pub const DEFAULT_COMPONENTS: usize = 5;
/// Default number of EM iterations
pub const DEFAULT_ITERATIONS: usize = 100;
/// Default seed for parameter initialization
pub const DEFAULT_SEED: u64 = 42;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of hidden states (`k`)
    pub n_components: usize,
    /// EM iterations to run
    pub n_iterations: usize,
    /// Seed for the initialization RNG
    pub random_seed: u64,
    /// Kernel execution strategy
    pub backend: BackendKind,
    /// Worker threads for the parallel backend (None = rayon global pool)
    pub threads: Option<usize>,
    /// Early-stopping tolerance on the total log-likelihood (None = fixed
    /// iteration count)
    pub tolerance: Option<f64>,
    /// Turn NaN/infinity during fitting into an error
    pub strict_numerics: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            n_components: DEFAULT_COMPONENTS,
            n_iterations: DEFAULT_ITERATIONS,
            random_seed: DEFAULT_SEED,
            backend: BackendKind::Sequential,
            threads: None,
            tolerance: None,
            strict_numerics: false,
        }
    }
}

impl EngineConfig {
    /// Reference behaviour: fixed iterations on one thread
    pub fn reference() -> Self {
        Self::default()
    }

    /// Multi-threaded configuration
    pub fn parallel(threads: Option<usize>) -> Self {
        EngineConfig {
            backend: BackendKind::Parallel,
            threads,
            ..Self::default()
        }
    }

    /// Set number of components
    pub fn with_components(mut self, n_components: usize) -> Self {
        self.n_components = n_components;
        self
    }

    /// Set number of iterations
    pub fn with_iterations(mut self, n_iterations: usize) -> Self {
        self.n_iterations = n_iterations;
        self
    }

    /// Set initialization seed
    pub fn with_seed(mut self, random_seed: u64) -> Self {
        self.random_seed = random_seed;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> SdmResult<()> {
        if self.n_components == 0 {
            return Err(config_error!("n_components must be positive"));
        }
        if self.n_iterations == 0 {
            return Err(config_error!("n_iterations must be positive"));
        }
        if self.threads == Some(0) {
            return Err(config_error!("threads must be positive when set"));
        }
        if let Some(tolerance) = self.tolerance {
            if tolerance <= 0.0 || !tolerance.is_finite() {
                return Err(config_error!("tolerance must be a positive number, got {}", tolerance));
            }
        }
        Ok(())
    }

    /// Build the configured backend
    pub fn create_backend(&self) -> SdmResult<Arc<dyn ExecutionBackend>> {
        create_backend(self.backend, self.threads)
    }

    /// Export configuration to JSON
    pub fn to_json(&self) -> SdmResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| config_error!("Failed to serialize configuration: {}", e))
    }

    /// Import configuration from JSON
    pub fn from_json(json: &str) -> SdmResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| config_error!("Failed to deserialize configuration: {}", e))?;
        config.validate()?;
        Ok(config)
    }
}
