//! Amplitude normalization and baseline removal

use crate::processor::SignalProcessor;
use sdm_core::{SdmResult, Signal, SignalStats};
use tracing::debug;

/// Rescales a signal to zero mean and unit variance
///
/// A constant signal is only centered.
#[derive(Debug, Clone, Default)]
pub struct Standardizer {
    last_stats: Option<SignalStats>,
}

impl Standardizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics of the input seen by the last call to `process`
    pub fn last_stats(&self) -> Option<&SignalStats> {
        self.last_stats.as_ref()
    }
}

impl SignalProcessor for Standardizer {
    fn process(&mut self, input: &Signal) -> SdmResult<Signal> {
        let stats = input.stats();
        let scale = if stats.std_dev > 0.0 { stats.std_dev } else { 1.0 };

        let output: Vec<f64> = input
            .samples()
            .iter()
            .map(|&x| (x - stats.mean) / scale)
            .collect();

        debug!(mean = stats.mean, std_dev = stats.std_dev, "standardized signal");
        self.last_stats = Some(stats);

        input.with_samples(output)
    }

    fn name(&self) -> &str {
        "standardizer"
    }

    fn reset(&mut self) {
        self.last_stats = None;
    }
}

/// Removes the least-squares linear trend
#[derive(Debug, Clone, Default)]
pub struct Detrender {
    last_slope: f64,
    last_intercept: f64,
}

impl Detrender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit `x = intercept + slope * t` over sample indices
    pub fn fit_line(samples: &[f64]) -> (f64, f64) {
        let n = samples.len();
        if n == 0 {
            return (0.0, 0.0);
        }

        let t_mean = (n - 1) as f64 / 2.0;
        let x_mean = samples.iter().sum::<f64>() / n as f64;

        let (mut covariance, mut spread) = (0.0, 0.0);
        for (t, &x) in samples.iter().enumerate() {
            let dt = t as f64 - t_mean;
            covariance += dt * (x - x_mean);
            spread += dt * dt;
        }

        let slope = if spread > 0.0 { covariance / spread } else { 0.0 };
        (x_mean - slope * t_mean, slope)
    }

    /// Slope removed by the last call to `process` (units per sample)
    pub fn last_slope(&self) -> f64 {
        self.last_slope
    }

    pub fn last_intercept(&self) -> f64 {
        self.last_intercept
    }
}

impl SignalProcessor for Detrender {
    fn process(&mut self, input: &Signal) -> SdmResult<Signal> {
        let (intercept, slope) = Self::fit_line(input.samples());

        let output: Vec<f64> = input
            .samples()
            .iter()
            .enumerate()
            .map(|(t, &x)| x - (intercept + slope * t as f64))
            .collect();

        debug!(slope, intercept, "removed linear trend");
        self.last_slope = slope;
        self.last_intercept = intercept;

        input.with_samples(output)
    }

    fn name(&self) -> &str {
        "detrender"
    }

    fn reset(&mut self) {
        self.last_slope = 0.0;
        self.last_intercept = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_standardizer_unit_variance() {
        let signal = Signal::new(vec![1.0, 3.0, 5.0, 7.0, 9.0], 10.0).unwrap();
        let mut standardizer = Standardizer::new();

        let output = standardizer.process(&signal).unwrap();
        let stats = output.stats();

        assert_abs_diff_eq!(stats.mean, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.std_dev, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(standardizer.last_stats().unwrap().mean, 5.0);
    }

    #[test]
    fn test_standardizer_constant_signal() {
        let signal = Signal::new(vec![4.0; 6], 10.0).unwrap();
        let output = Standardizer::new().process(&signal).unwrap();
        assert!(output.samples().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_detrender_removes_line() {
        let samples: Vec<f64> = (0..50).map(|t| 2.0 + 0.5 * t as f64).collect();
        let signal = Signal::new(samples, 10.0).unwrap();
        let mut detrender = Detrender::new();

        let output = detrender.process(&signal).unwrap();

        assert_abs_diff_eq!(detrender.last_slope(), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(detrender.last_intercept(), 2.0, epsilon = 1e-10);
        for &x in output.samples() {
            assert_abs_diff_eq!(x, 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_detrender_keeps_level_changes() {
        // Symmetric step: no net trend, so the step survives
        let samples: Vec<f64> = (0..40).map(|t| if (10..30).contains(&t) { 3.0 } else { 0.0 }).collect();
        let signal = Signal::new(samples.clone(), 10.0).unwrap();

        let output = Detrender::new().process(&signal).unwrap();
        let step = output.samples()[20] - output.samples()[0];
        assert_abs_diff_eq!(step, 3.0, epsilon = 0.5);
    }

    #[test]
    fn test_fit_line_single_sample() {
        assert_eq!(Detrender::fit_line(&[7.0]), (7.0, 0.0));
    }
}
