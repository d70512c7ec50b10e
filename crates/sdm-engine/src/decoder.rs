//! Per-sample hidden-state decoding
//!
//! Every sample is labelled with the component of highest log-density,
//! independently of its neighbours. No transition-aware path search is run.

use crate::backend::ExecutionBackend;
use crate::mixture::GaussianMixtureState;
use ndarray::Array2;
use sdm_core::{LabelSequence, ObservationSet, SdmResult};
use std::sync::Arc;

/// Assigns component labels from a fitted [`GaussianMixtureState`]
#[derive(Debug, Clone)]
pub struct StateDecoder {
    backend: Arc<dyn ExecutionBackend>,
}

impl StateDecoder {
    /// Decoder running on the given backend
    pub fn new(backend: Arc<dyn ExecutionBackend>) -> Self {
        StateDecoder { backend }
    }

    /// Label each observation with its most likely component
    pub fn predict(&self, state: &GaussianMixtureState, observations: &ObservationSet) -> SdmResult<LabelSequence> {
        let log_likelihood = state.log_likelihood_matrix_with(observations, self.backend.as_ref())?;
        let labels = self.backend.argmax_columns(log_likelihood.view());
        LabelSequence::new(labels, state.n_components())
    }

    /// `k × n` responsibilities with the start-weight prior applied
    pub fn predict_proba(&self, state: &GaussianMixtureState, observations: &ObservationSet) -> SdmResult<Array2<f64>> {
        Ok(state
            .posterior_with(observations, self.backend.as_ref())?
            .responsibilities)
    }
}
