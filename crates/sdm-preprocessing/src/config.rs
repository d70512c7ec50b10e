//! Configuration management for signal preprocessing

use sdm_core::{config_error, SdmResult};
use serde::{Deserialize, Serialize};

/// Default outlier window (samples)
pub const DEFAULT_OUTLIER_WINDOW: usize = 25;
/// Default outlier threshold (standard deviations)
pub const DEFAULT_OUTLIER_THRESHOLD: f64 = 3.0;

/// Preprocessing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Replace transient outliers by interpolation
    pub interpolate_outliers: bool,
    /// Centered window used to judge outliers (samples)
    pub outlier_window: usize,
    /// Deviation, in window standard deviations, that marks an outlier
    pub outlier_threshold: f64,
    /// Rescale to zero mean and unit variance
    pub standardize: bool,
    /// Remove the least-squares linear trend
    pub detrend: bool,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        PreprocessingConfig {
            interpolate_outliers: true,
            outlier_window: DEFAULT_OUTLIER_WINDOW,
            outlier_threshold: DEFAULT_OUTLIER_THRESHOLD,
            standardize: true,
            detrend: true,
        }
    }
}

impl PreprocessingConfig {
    /// Configuration that passes the signal through untouched
    pub fn passthrough() -> Self {
        PreprocessingConfig {
            interpolate_outliers: false,
            standardize: false,
            detrend: false,
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> SdmResult<()> {
        if self.outlier_window < 3 {
            return Err(config_error!(
                "outlier_window must be at least 3 samples, got {}",
                self.outlier_window
            ));
        }
        if self.outlier_threshold <= 0.0 || !self.outlier_threshold.is_finite() {
            return Err(config_error!(
                "outlier_threshold must be a positive number, got {}",
                self.outlier_threshold
            ));
        }
        Ok(())
    }

    /// Export configuration to JSON
    pub fn to_json(&self) -> SdmResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| config_error!("Failed to serialize configuration: {}", e))
    }

    /// Import configuration from JSON
    pub fn from_json(json: &str) -> SdmResult<Self> {
        let config: PreprocessingConfig = serde_json::from_str(json)
            .map_err(|e| config_error!("Failed to deserialize configuration: {}", e))?;
        config.validate()?;
        Ok(config)
    }
}
