//! Expectation-Maximization over a Gaussian mixture
//!
//! Each iteration computes responsibilities from the current parameters
//! (E-step) and re-estimates component means and variances from them
//! (M-step). Start weights and the transition matrix keep their initial
//! values for the whole fit.

use crate::backend::ExecutionBackend;
use crate::config::EngineConfig;
use crate::mixture::{floor_variance, GaussianMixtureState};
use ndarray::{Array1, Array2, Axis};
use sdm_core::{config_error, dimension_error, ObservationSet, SdmError, SdmResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Occupancy below which a component counts as collapsed
pub const OCCUPANCY_FLOOR: f64 = 1e-10;

/// Recoverable conditions observed while fitting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FitWarning {
    /// A component received (almost) no responsibility; its occupancy was
    /// clamped to [`OCCUPANCY_FLOOR`] for the update
    DegenerateComponent {
        iteration: usize,
        component: usize,
        occupancy: f64,
    },
    /// NaN or infinity appeared in log-likelihoods, means or variances
    NumericalInstability { iteration: usize },
}

/// Outcome of a fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    /// Completed EM iterations
    pub iterations: usize,
    /// Stopped early on the log-likelihood tolerance
    pub converged: bool,
    /// Total log-likelihood computed by each iteration's E-step
    pub log_likelihood_history: Vec<f64>,
    /// Degeneracy and instability events in occurrence order
    pub warnings: Vec<FitWarning>,
    /// Wall-clock time of the fit in microseconds
    pub elapsed_us: u64,
}

impl FitReport {
    /// Any component collapsed during the fit
    pub fn is_degenerate(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, FitWarning::DegenerateComponent { .. }))
    }

    /// Any non-finite value was produced
    pub fn is_unstable(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, FitWarning::NumericalInstability { .. }))
    }

    /// Log-likelihood of the last E-step
    pub fn final_log_likelihood(&self) -> Option<f64> {
        self.log_likelihood_history.last().copied()
    }
}

/// Runs EM iterations on a [`GaussianMixtureState`]
#[derive(Debug, Clone)]
pub struct EMTrainer {
    backend: Arc<dyn ExecutionBackend>,
    tolerance: Option<f64>,
    strict_numerics: bool,
}

impl EMTrainer {
    /// Fixed-iteration trainer on the given backend
    pub fn new(backend: Arc<dyn ExecutionBackend>) -> Self {
        EMTrainer {
            backend,
            tolerance: None,
            strict_numerics: false,
        }
    }

    /// Trainer matching an engine configuration
    pub fn from_config(config: &EngineConfig) -> SdmResult<Self> {
        config.validate()?;
        let backend = config.create_backend()?;

        let mut trainer = EMTrainer::new(backend);
        trainer.tolerance = config.tolerance;
        trainer.strict_numerics = config.strict_numerics;
        Ok(trainer)
    }

    /// Stop once the log-likelihood changes by less than `tolerance`
    pub fn with_tolerance(mut self, tolerance: Option<f64>) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Fail instead of warning when NaN or infinity appears
    pub fn with_strict_numerics(mut self, strict: bool) -> Self {
        self.strict_numerics = strict;
        self
    }

    /// Backend running the kernels
    pub fn backend(&self) -> &Arc<dyn ExecutionBackend> {
        &self.backend
    }

    /// Refine `state` in place with `n_iterations` EM iterations
    ///
    /// Runs exactly `n_iterations` iterations unless a tolerance is set and
    /// met first.
    pub fn fit(
        &self,
        state: &mut GaussianMixtureState,
        observations: &ObservationSet,
        n_iterations: usize,
    ) -> SdmResult<FitReport> {
        observations.ensure_dim(state.n_features())?;

        if observations.len() < state.n_components() {
            return Err(dimension_error!(
                "{} observations cannot support {} components",
                observations.len(),
                state.n_components()
            ));
        }
        if n_iterations == 0 {
            return Err(config_error!("n_iterations must be positive"));
        }

        let start_time = Instant::now();
        let mut report = FitReport {
            iterations: 0,
            converged: false,
            log_likelihood_history: Vec::with_capacity(n_iterations),
            warnings: Vec::new(),
            elapsed_us: 0,
        };

        for iteration in 0..n_iterations {
            // E-step
            let posterior = state.posterior_with(observations, self.backend.as_ref())?;
            let log_likelihood = posterior.total_log_likelihood();

            let e_step_finite = posterior.log_evidence.iter().all(|v| v.is_finite());
            if !e_step_finite && self.strict_numerics {
                return Err(SdmError::NumericalInstability {
                    iteration,
                    reason: "log-likelihood is not finite".to_string(),
                });
            }

            // M-step; `state` is only written once the update is accepted
            let (means, variances) =
                self.maximize(state, observations, &posterior.responsibilities, iteration, &mut report);
            let m_step_finite = means.iter().chain(variances.iter()).all(|v| v.is_finite());
            if !m_step_finite && self.strict_numerics {
                return Err(SdmError::NumericalInstability {
                    iteration,
                    reason: "means or variances are not finite".to_string(),
                });
            }

            let params = state.parameters_mut();
            params.means = means;
            params.variances = variances;

            if !e_step_finite || !m_step_finite {
                let reason = if !e_step_finite {
                    "log-likelihood is not finite"
                } else {
                    "means or variances are not finite"
                };
                warn!(iteration, reason, "numerical instability during EM");
                report.warnings.push(FitWarning::NumericalInstability { iteration });
            }

            debug!(iteration, log_likelihood, "EM iteration");
            let previous = report.final_log_likelihood();
            report.log_likelihood_history.push(log_likelihood);
            report.iterations = iteration + 1;

            if let (Some(tolerance), Some(previous)) = (self.tolerance, previous) {
                if (log_likelihood - previous).abs() < tolerance {
                    report.converged = true;
                    break;
                }
            }
        }

        report.elapsed_us = start_time.elapsed().as_micros() as u64;

        info!(
            iterations = report.iterations,
            converged = report.converged,
            log_likelihood = report.final_log_likelihood(),
            warnings = report.warnings.len(),
            backend = ?self.backend.kind(),
            "EM fit finished"
        );

        Ok(report)
    }

    /// Re-estimate means, then variances around the new means
    fn maximize(
        &self,
        state: &GaussianMixtureState,
        observations: &ObservationSet,
        responsibilities: &Array2<f64>,
        iteration: usize,
        report: &mut FitReport,
    ) -> (Array2<f64>, Array2<f64>) {
        let k = state.n_components();
        let d = state.n_features();
        let data = observations.view();

        let mut occupancy: Array1<f64> = responsibilities
            .axis_iter(Axis(0))
            .map(|row| row.iter().sum::<f64>())
            .collect();

        for (component, denom) in occupancy.iter_mut().enumerate() {
            if *denom < OCCUPANCY_FLOOR {
                warn!(iteration, component, occupancy = *denom, "degenerate mixture component");
                report.warnings.push(FitWarning::DegenerateComponent {
                    iteration,
                    component,
                    occupancy: *denom,
                });
                *denom = OCCUPANCY_FLOOR;
            }
        }

        let mut means = Array2::zeros((k, d));
        self.backend.for_each_row(&mut means, &|c, mut mean| {
            let resp = responsibilities.row(c);
            for j in 0..d {
                let weighted: f64 = resp
                    .iter()
                    .zip(data.column(j).iter())
                    .map(|(&r, &x)| r * x)
                    .sum();
                mean[j] = weighted / occupancy[c];
            }
        });

        let mut variances = Array2::zeros((k, d));
        self.backend.for_each_row(&mut variances, &|c, mut variance| {
            let resp = responsibilities.row(c);
            for j in 0..d {
                let mu = means[[c, j]];
                let weighted: f64 = resp
                    .iter()
                    .zip(data.column(j).iter())
                    .map(|(&r, &x)| r * (x - mu).powi(2))
                    .sum();
                variance[j] = floor_variance(weighted / occupancy[c]);
            }
        });

        (means, variances)
    }
}
