//! Pre-defined regime sets for simulation

use serde::{Deserialize, Serialize};

/// Signal level and spread of one hidden regime
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeSpec {
    /// Mean signal level while the regime is active
    pub mean: f64,
    /// Standard deviation of the Gaussian noise around the mean
    pub std_dev: f64,
}

impl RegimeSpec {
    pub fn new(mean: f64, std_dev: f64) -> Self {
        RegimeSpec { mean, std_dev }
    }
}

/// Common regime sets
pub fn presets() -> Vec<(&'static str, Vec<RegimeSpec>)> {
    vec![
        ("Rest / Active", vec![
            RegimeSpec::new(0.0, 0.2),
            RegimeSpec::new(2.0, 0.3),
        ]),
        ("Sleep Stages", vec![
            RegimeSpec::new(-1.0, 0.25),
            RegimeSpec::new(0.5, 0.25),
            RegimeSpec::new(2.5, 0.4),
        ]),
        ("Graded Arousal", vec![
            RegimeSpec::new(-2.0, 0.2),
            RegimeSpec::new(-0.5, 0.2),
            RegimeSpec::new(1.0, 0.3),
            RegimeSpec::new(2.5, 0.3),
            RegimeSpec::new(4.5, 0.5),
        ]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_well_formed() {
        for (name, regimes) in presets() {
            assert!(!name.is_empty());
            assert!(regimes.len() >= 2);
            assert!(regimes.iter().all(|r| r.std_dev > 0.0));
        }
    }
}
