//! Sliding-window outlier detection with linear interpolation

use crate::processor::SignalProcessor;
use sdm_core::{SdmError, SdmResult, Signal, SignalStats};
use tracing::debug;

/// Replaces transient outliers by interpolating between valid neighbours
///
/// A sample is an outlier when it lies more than `threshold` standard
/// deviations from the mean of its centered window, the sample itself
/// excluded. Detection always runs on the unmodified input.
#[derive(Debug, Clone)]
pub struct OutlierInterpolator {
    window_size: usize,
    threshold: f64,
    last_outliers: Vec<usize>,
}

impl OutlierInterpolator {
    /// Create new interpolator
    pub fn new(window_size: usize, threshold: f64) -> SdmResult<Self> {
        if window_size < 3 {
            return Err(SdmError::ConfigurationError {
                message: format!("Outlier window must hold at least 3 samples, got {}", window_size),
            });
        }
        if threshold <= 0.0 || !threshold.is_finite() {
            return Err(SdmError::ConfigurationError {
                message: format!("Outlier threshold must be positive, got {}", threshold),
            });
        }

        Ok(OutlierInterpolator {
            window_size,
            threshold,
            last_outliers: Vec::new(),
        })
    }

    /// Indices flagged by the last call to `process`
    pub fn last_outliers(&self) -> &[usize] {
        &self.last_outliers
    }

    /// Flag outlier positions in `samples`
    pub fn detect(&self, samples: &[f64]) -> Vec<bool> {
        let n = samples.len();
        let half = self.window_size / 2;
        let mut neighbours = Vec::with_capacity(self.window_size);

        (0..n)
            .map(|i| {
                let start = i.saturating_sub(half);
                let end = (i + half + 1).min(n);

                neighbours.clear();
                neighbours.extend_from_slice(&samples[start..i]);
                neighbours.extend_from_slice(&samples[i + 1..end]);

                if neighbours.len() < 2 {
                    return false;
                }

                let stats = SignalStats::calculate(&neighbours);
                (samples[i] - stats.mean).abs() > self.threshold * stats.std_dev
            })
            .collect()
    }

    /// Replace flagged samples by linear interpolation
    ///
    /// Leading or trailing runs copy the nearest valid sample; an input with
    /// no valid samples is returned unchanged. `flags` must hold one entry
    /// per sample.
    pub fn interpolate(samples: &[f64], flags: &[bool]) -> SdmResult<Vec<f64>> {
        if flags.len() != samples.len() {
            return Err(SdmError::InvalidSignalData {
                reason: format!(
                    "{} outlier flags for {} samples",
                    flags.len(),
                    samples.len()
                ),
            });
        }

        let mut output = samples.to_vec();
        let valid: Vec<usize> = (0..samples.len()).filter(|&i| !flags[i]).collect();

        if valid.is_empty() {
            return Ok(output);
        }

        // Position in `valid` of the next valid index at or after i
        let mut next = 0;
        for i in 0..samples.len() {
            if !flags[i] {
                continue;
            }
            while next < valid.len() && valid[next] < i {
                next += 1;
            }

            let before = if next > 0 { Some(valid[next - 1]) } else { None };
            let after = valid.get(next).copied();

            output[i] = match (before, after) {
                (Some(b), Some(a)) => {
                    let fraction = (i - b) as f64 / (a - b) as f64;
                    samples[b] + fraction * (samples[a] - samples[b])
                }
                (Some(b), None) => samples[b],
                (None, Some(a)) => samples[a],
                (None, None) => samples[i],
            };
        }

        Ok(output)
    }
}

impl SignalProcessor for OutlierInterpolator {
    fn process(&mut self, input: &Signal) -> SdmResult<Signal> {
        let flags = self.detect(input.samples());
        let cleaned = Self::interpolate(input.samples(), &flags)?;

        self.last_outliers = flags
            .iter()
            .enumerate()
            .filter(|(_, &flagged)| flagged)
            .map(|(i, _)| i)
            .collect();

        debug!(outliers = self.last_outliers.len(), samples = input.len(), "interpolated outliers");

        input.with_samples(cleaned)
    }

    fn name(&self) -> &str {
        "outlier_interpolator"
    }

    fn samples_modified(&self) -> usize {
        self.last_outliers.len()
    }

    fn flagged_indices(&self) -> &[usize] {
        &self.last_outliers
    }

    fn reset(&mut self) {
        self.last_outliers.clear();
    }
}
