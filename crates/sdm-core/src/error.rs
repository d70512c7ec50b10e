//! Error handling for the state-discovery framework
//!
//! A single error type shared by every crate in the workspace. Only caller
//! misuse (dimension mismatches, bad configuration, unusable input) and
//! strict-mode numerical failures surface here; recoverable fitting
//! conditions are reported as warnings on the fit report instead.

use thiserror::Error;

/// Result type alias for framework operations
pub type SdmResult<T> = Result<T, SdmError>;

/// Error type for all framework operations
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum SdmError {
    /// Observation or model dimensionality is invalid or mismatched
    #[error("Invalid dimension: {reason}")]
    InvalidDimension {
        /// Description of the mismatch
        reason: String,
    },

    /// NaN or infinity appeared during fitting (strict mode only)
    #[error("Numerical instability at iteration {iteration}: {reason}")]
    NumericalInstability {
        /// EM iteration (zero-based) where the problem was detected
        iteration: usize,
        /// Which quantity went non-finite
        reason: String,
    },

    /// Invalid configuration value
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem
        message: String,
    },

    /// Signal data cannot be used (empty, non-finite, wrong length)
    #[error("Invalid signal data: {reason}")]
    InvalidSignalData {
        /// Description of the data issue
        reason: String,
    },

    /// Synthetic signal generation failed
    #[error("Simulation error: {message}")]
    SimulationError {
        /// Description of the failure
        message: String,
    },
}

/// Convenience macro for creating dimension errors
#[macro_export]
macro_rules! dimension_error {
    ($($arg:tt)+) => {
        $crate::error::SdmError::InvalidDimension {
            reason: format!($($arg)+),
        }
    };
}

/// Convenience macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)+) => {
        $crate::error::SdmError::ConfigurationError {
            message: format!($($arg)+),
        }
    };
}
