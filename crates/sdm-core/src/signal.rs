//! Signal: owned single-channel sample container

use crate::error::{SdmError, SdmResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Single-channel physiological time series
///
/// Handed from preprocessing to the model. Each processor produces a new
/// `Signal` that keeps the source id and sampling rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Unique identifier of the recording this signal derives from
    pub id: Uuid,
    /// Sampling rate in Hz
    pub sampling_rate: f64,
    samples: Vec<f64>,
}

impl Signal {
    /// Create new signal from samples
    pub fn new(samples: Vec<f64>, sampling_rate: f64) -> SdmResult<Self> {
        if sampling_rate <= 0.0 || !sampling_rate.is_finite() {
            return Err(SdmError::InvalidSignalData {
                reason: format!("Sampling rate must be positive, got {}", sampling_rate),
            });
        }

        Ok(Signal {
            id: Uuid::new_v4(),
            sampling_rate,
            samples,
        })
    }

    /// Derive a signal with new samples, keeping id and sampling rate
    pub fn with_samples(&self, samples: Vec<f64>) -> SdmResult<Self> {
        if samples.len() != self.samples.len() {
            return Err(SdmError::InvalidSignalData {
                reason: format!(
                    "Derived length {} doesn't match source length {}",
                    samples.len(),
                    self.samples.len()
                ),
            });
        }

        Ok(Signal {
            id: self.id,
            sampling_rate: self.sampling_rate,
            samples,
        })
    }

    /// Borrow samples
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Consume the signal and return its samples
    pub fn into_samples(self) -> Vec<f64> {
        self.samples
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if signal is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Signal duration in seconds
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sampling_rate
    }

    /// Time vector for plotting
    pub fn time_vector(&self) -> Vec<f64> {
        let dt = 1.0 / self.sampling_rate;
        (0..self.samples.len()).map(|i| i as f64 * dt).collect()
    }

    /// Index of the first non-finite sample, if any
    pub fn first_non_finite(&self) -> Option<usize> {
        self.samples.iter().position(|x| !x.is_finite())
    }

    /// Basic statistics
    pub fn stats(&self) -> SignalStats {
        SignalStats::calculate(&self.samples)
    }
}

/// Basic statistics for a sample slice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalStats {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl SignalStats {
    /// Population statistics; all zeros for an empty slice
    pub fn calculate(data: &[f64]) -> Self {
        if data.is_empty() {
            return Self {
                mean: 0.0,
                std_dev: 0.0,
                min: 0.0,
                max: 0.0,
            };
        }

        let n = data.len() as f64;
        let mean = data.iter().sum::<f64>() / n;
        let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

        let min = data.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let max = data.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));

        Self {
            mean,
            std_dev: variance.sqrt(),
            min,
            max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_signal_creation() {
        let signal = Signal::new(vec![0.0; 500], 250.0).unwrap();
        assert_eq!(signal.len(), 500);
        assert_relative_eq!(signal.duration(), 2.0);
        assert_eq!(signal.time_vector()[2], 2.0 / 250.0);
    }

    #[test]
    fn test_invalid_sampling_rate() {
        assert!(Signal::new(vec![1.0], 0.0).is_err());
        assert!(Signal::new(vec![1.0], f64::NAN).is_err());
    }

    #[test]
    fn test_with_samples_keeps_identity() {
        let signal = Signal::new(vec![1.0, 2.0, 3.0], 100.0).unwrap();
        let derived = signal.with_samples(vec![0.0, 0.0, 0.0]).unwrap();
        assert_eq!(derived.id, signal.id);
        assert_eq!(derived.sampling_rate, 100.0);

        assert!(signal.with_samples(vec![0.0]).is_err());
    }

    #[test]
    fn test_stats() {
        let stats = SignalStats::calculate(&[1.0, 2.0, 3.0, 4.0]);
        assert_relative_eq!(stats.mean, 2.5);
        assert_relative_eq!(stats.std_dev, 1.25f64.sqrt());
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
    }

    #[test]
    fn test_first_non_finite() {
        let signal = Signal::new(vec![1.0, f64::NAN, 2.0], 10.0).unwrap();
        assert_eq!(signal.first_non_finite(), Some(1));
    }
}
