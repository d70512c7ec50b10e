//! Config-driven facade: initialize, fit and decode in one place

use crate::config::EngineConfig;
use crate::decoder::StateDecoder;
use crate::mixture::GaussianMixtureState;
use crate::trainer::{EMTrainer, FitReport};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sdm_core::{config_error, dimension_error, LabelSequence, ObservationSet, SdmResult};
use tracing::info;

/// Hidden-state discovery model
///
/// Owns its [`GaussianMixtureState`]; each call to [`fit`](Self::fit)
/// re-initializes it from the configured seed.
#[derive(Debug, Clone)]
pub struct StateDiscoveryModel {
    config: EngineConfig,
    trainer: EMTrainer,
    decoder: StateDecoder,
    state: Option<GaussianMixtureState>,
}

impl StateDiscoveryModel {
    /// Create an unfitted model
    pub fn new(config: EngineConfig) -> SdmResult<Self> {
        let trainer = EMTrainer::from_config(&config)?;
        let decoder = StateDecoder::new(trainer.backend().clone());

        Ok(StateDiscoveryModel {
            config,
            trainer,
            decoder,
            state: None,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fitted state, if any
    pub fn state(&self) -> Option<&GaussianMixtureState> {
        self.state.as_ref()
    }

    /// Initialize from the seed and run EM on `observations`
    pub fn fit(&mut self, observations: &ObservationSet) -> SdmResult<FitReport> {
        let k = self.config.n_components;
        if observations.len() < k {
            return Err(dimension_error!(
                "{} observations cannot support {} components",
                observations.len(),
                k
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.config.random_seed);
        let mut state = GaussianMixtureState::initialize(k, observations.dim(), &mut rng)?;

        info!(
            n_samples = observations.len(),
            n_features = observations.dim(),
            n_components = k,
            seed = self.config.random_seed,
            "fitting state-discovery model"
        );

        let report = self
            .trainer
            .fit(&mut state, observations, self.config.n_iterations)?;
        self.state = Some(state);
        Ok(report)
    }

    /// Label each observation with its most likely state
    pub fn predict(&self, observations: &ObservationSet) -> SdmResult<LabelSequence> {
        self.decoder.predict(self.fitted()?, observations)
    }

    /// Posterior state probabilities, `k × n`
    pub fn predict_proba(&self, observations: &ObservationSet) -> SdmResult<Array2<f64>> {
        self.decoder.predict_proba(self.fitted()?, observations)
    }

    /// Fit then predict on the same observations
    pub fn fit_predict(&mut self, observations: &ObservationSet) -> SdmResult<(FitReport, LabelSequence)> {
        let report = self.fit(observations)?;
        let labels = self.predict(observations)?;
        Ok((report, labels))
    }

    fn fitted(&self) -> SdmResult<&GaussianMixtureState> {
        self.state
            .as_ref()
            .ok_or_else(|| config_error!("model must be fitted before predicting"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendKind;
    use sdm_core::SdmError;
    use sdm_preprocessing::Pipeline;
    use sdm_simulation::{RegimeSimulator, SimulationConfig};

    fn step_signal() -> ObservationSet {
        ObservationSet::from_samples(&[0.0, 0.0, 0.0, 10.0, 10.0, 10.0, 0.0, 0.0, 0.0]).unwrap()
    }

    #[test]
    fn test_step_signal_labels() {
        let config = EngineConfig::default().with_components(2).with_iterations(50);
        let mut model = StateDiscoveryModel::new(config).unwrap();

        let (_, labels) = model.fit_predict(&step_signal()).unwrap();
        let labels = labels.as_slice();

        assert_eq!(labels.len(), 9);
        assert!(labels[..3].iter().all(|&l| l == labels[0]));
        assert!(labels[6..].iter().all(|&l| l == labels[0]));
        assert!(labels[3..6].iter().all(|&l| l == labels[3]));
        assert_ne!(labels[0], labels[3]);

        // Stable across repeated predictions
        let again = model.predict(&step_signal()).unwrap();
        assert_eq!(again.as_slice(), labels);
    }

    #[test]
    fn test_fit_is_reproducible() {
        let samples: Vec<f64> = (0..300).map(|i| ((i * 13) % 29) as f64 * 0.3).collect();
        let observations = ObservationSet::from_samples(&samples).unwrap();
        let config = EngineConfig::default().with_iterations(25).with_seed(1234);

        let mut first = StateDiscoveryModel::new(config.clone()).unwrap();
        let mut second = StateDiscoveryModel::new(config).unwrap();
        let first_report = first.fit(&observations).unwrap();
        let second_report = second.fit(&observations).unwrap();

        assert_eq!(first.state(), second.state());
        assert_eq!(first_report.log_likelihood_history, second_report.log_likelihood_history);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let samples: Vec<f64> = (0..1000).map(|i| (i as f64 * 0.013).sin() * 3.0 + (i % 7) as f64).collect();
        let observations = ObservationSet::from_samples(&samples).unwrap();

        let base = EngineConfig::default().with_iterations(15);
        let mut sequential = StateDiscoveryModel::new(base.clone()).unwrap();
        let mut parallel = StateDiscoveryModel::new(EngineConfig {
            backend: BackendKind::Parallel,
            threads: Some(3),
            ..base
        })
        .unwrap();

        let (_, sequential_labels) = sequential.fit_predict(&observations).unwrap();
        let (_, parallel_labels) = parallel.fit_predict(&observations).unwrap();

        assert_eq!(sequential.state(), parallel.state());
        assert_eq!(sequential_labels, parallel_labels);
    }

    #[test]
    fn test_single_component() {
        let config = EngineConfig::default().with_components(1).with_iterations(10);
        let mut model = StateDiscoveryModel::new(config).unwrap();
        let observations = ObservationSet::from_samples(&[-3.0, 0.5, 8.0, 2.0]).unwrap();

        let (_, labels) = model.fit_predict(&observations).unwrap();
        assert!(labels.iter().all(|label| label == 0));
    }

    #[test]
    fn test_constant_input() {
        let config = EngineConfig::default().with_components(3).with_iterations(20);
        let mut model = StateDiscoveryModel::new(config).unwrap();
        let observations = ObservationSet::from_samples(&[1.5; 10]).unwrap();

        let (_, labels) = model.fit_predict(&observations).unwrap();
        let first = labels.get(0).unwrap();
        assert!(labels.iter().all(|label| label == first));

        let state = model.state().unwrap();
        let mean = state.parameters().means[[first, 0]];
        assert!((mean - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_more_components_than_samples() {
        let mut model = StateDiscoveryModel::new(EngineConfig::default()).unwrap();
        let observations = ObservationSet::from_samples(&[1.0, 2.0, 3.0]).unwrap();

        assert!(matches!(
            model.fit(&observations),
            Err(SdmError::InvalidDimension { .. })
        ));
        assert!(model.state().is_none());
    }

    #[test]
    fn test_predict_before_fit() {
        let model = StateDiscoveryModel::new(EngineConfig::default()).unwrap();
        let result = model.predict(&step_signal());
        assert!(matches!(result, Err(SdmError::ConfigurationError { .. })));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig::default().with_iterations(0);
        assert!(StateDiscoveryModel::new(config).is_err());
    }

    #[test]
    fn test_recovers_simulated_regimes() {
        let simulation = SimulationConfig {
            seed: Some(2024),
            ..SimulationConfig::default()
        };
        let mut simulator = RegimeSimulator::new(simulation).unwrap();
        let recording = simulator.generate(3000).unwrap();

        let mut pipeline = Pipeline::standard().unwrap();
        let cleaned = pipeline.process(&recording.signal).unwrap();
        let observations = ObservationSet::from_signal(&cleaned.output_signal).unwrap();

        let n_regimes = simulator.config().regimes.len();
        let config = EngineConfig::default().with_components(n_regimes).with_iterations(100);
        let mut model = StateDiscoveryModel::new(config).unwrap();
        let (report, labels) = model.fit_predict(&observations).unwrap();

        assert!(!report.is_unstable());
        assert_eq!(labels.len(), recording.labels.len());

        // Every true regime should be dominated by a single decoded label
        let mut dominant = Vec::new();
        for regime in 0..n_regimes {
            let mut votes = vec![0usize; n_regimes];
            let mut total = 0;
            for (truth, decoded) in recording.labels.iter().zip(labels.iter()) {
                if truth == regime {
                    votes[decoded] += 1;
                    total += 1;
                }
            }
            let (best_label, best) = votes
                .iter()
                .copied()
                .enumerate()
                .max_by_key(|&(_, count)| count)
                .unwrap();
            assert!(total > 0);
            assert!(best as f64 / total as f64 > 0.9, "regime {} votes {:?}", regime, votes);
            dominant.push(best_label);
        }
        assert_ne!(dominant[0], dominant[1]);
    }
}
