//! Diagonal-covariance Gaussian mixture parameters and density evaluation

use crate::backend::{log_sum_exp, ExecutionBackend, SequentialBackend};
use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use sdm_core::{dimension_error, ObservationSet, SdmResult};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Lower bound applied to every variance before it is used or stored
pub const VARIANCE_FLOOR: f64 = 1e-6;

/// Allowed drift of the start-weight sum from 1
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Mixture parameters for `k` components over `d` features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixtureParameters {
    /// Component means, `k × d`
    pub means: Array2<f64>,
    /// Diagonal variances, `k × d`, strictly positive
    pub variances: Array2<f64>,
    /// Prior weight of each component, sums to 1
    pub start_weights: Array1<f64>,
    /// `k × k` row-stochastic matrix. Initialized once and never read or
    /// updated: samples are modelled as independent mixture draws.
    pub transition_matrix: Array2<f64>,
}

impl MixtureParameters {
    /// Number of components (`k`)
    pub fn n_components(&self) -> usize {
        self.means.nrows()
    }

    /// Feature dimensionality (`d`)
    pub fn n_features(&self) -> usize {
        self.means.ncols()
    }

    /// Check shapes and value ranges
    pub fn validate(&self) -> SdmResult<()> {
        let k = self.n_components();
        let d = self.n_features();

        if k == 0 || d == 0 {
            return Err(dimension_error!(
                "mixture needs at least one component and one feature, got k={}, d={}",
                k,
                d
            ));
        }
        if self.variances.dim() != (k, d) {
            return Err(dimension_error!(
                "variances are {:?}, means are {:?}",
                self.variances.dim(),
                (k, d)
            ));
        }
        if self.start_weights.len() != k {
            return Err(dimension_error!(
                "{} start weights for {} components",
                self.start_weights.len(),
                k
            ));
        }
        if self.transition_matrix.dim() != (k, k) {
            return Err(dimension_error!(
                "transition matrix is {:?}, expected {:?}",
                self.transition_matrix.dim(),
                (k, k)
            ));
        }
        if self.variances.iter().any(|&v| v <= 0.0 || !v.is_finite()) {
            return Err(dimension_error!("variances must be finite and strictly positive"));
        }
        if self.start_weights.iter().any(|&w| w < 0.0 || w.is_nan()) {
            return Err(dimension_error!("start weights must be nonnegative"));
        }
        let weight_sum = self.start_weights.sum();
        if (weight_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(dimension_error!("start weights sum to {}, expected 1", weight_sum));
        }

        Ok(())
    }

    /// True when every mean and variance is finite
    pub fn is_finite(&self) -> bool {
        self.means.iter().all(|v| v.is_finite()) && self.variances.iter().all(|v| v.is_finite())
    }
}

/// Posterior over components for every sample
#[derive(Debug, Clone)]
pub struct Posterior {
    /// `k × n` responsibilities; every column sums to 1
    pub responsibilities: Array2<f64>,
    /// Per-sample log normalizer `ln sum_c w_c p(x_i | c)`
    pub log_evidence: Array1<f64>,
}

impl Posterior {
    /// Total data log-likelihood under the mixture
    pub fn total_log_likelihood(&self) -> f64 {
        self.log_evidence.sum()
    }
}

/// Current estimate of the mixture model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianMixtureState {
    params: MixtureParameters,
}

impl GaussianMixtureState {
    /// Random initial state
    ///
    /// Means are standard-normal draws, variances start at 1, and start
    /// weights (and each transition row) are the softmax of uniform draws.
    pub fn initialize<R: Rng + ?Sized>(n_components: usize, n_features: usize, rng: &mut R) -> SdmResult<Self> {
        if n_components < 1 || n_features < 1 {
            return Err(dimension_error!(
                "mixture needs at least one component and one feature, got k={}, d={}",
                n_components,
                n_features
            ));
        }

        let means = Array2::<f64>::from_shape_fn((n_components, n_features), |_| StandardNormal.sample(rng));
        let variances = Array2::from_elem((n_components, n_features), 1.0);

        let weight_draws = Array1::from_shape_fn(n_components, |_| rng.gen::<f64>());
        let start_weights = softmax(&weight_draws);

        let mut transition_matrix = Array2::from_shape_fn((n_components, n_components), |_| rng.gen::<f64>());
        for mut row in transition_matrix.axis_iter_mut(Axis(0)) {
            let normalized = softmax(&row.to_owned());
            row.assign(&normalized);
        }

        Ok(GaussianMixtureState {
            params: MixtureParameters {
                means,
                variances,
                start_weights,
                transition_matrix,
            },
        })
    }

    /// Wrap explicit parameters after validating them
    pub fn from_parameters(params: MixtureParameters) -> SdmResult<Self> {
        params.validate()?;
        Ok(GaussianMixtureState { params })
    }

    /// Read-only view of the parameters
    pub fn parameters(&self) -> &MixtureParameters {
        &self.params
    }

    /// Consume the state and return its parameters
    pub fn into_parameters(self) -> MixtureParameters {
        self.params
    }

    pub(crate) fn parameters_mut(&mut self) -> &mut MixtureParameters {
        &mut self.params
    }

    /// Number of components (`k`)
    pub fn n_components(&self) -> usize {
        self.params.n_components()
    }

    /// Feature dimensionality (`d`)
    pub fn n_features(&self) -> usize {
        self.params.n_features()
    }

    /// `k × n` matrix of per-component log-densities on the calling thread
    pub fn log_likelihood_matrix(&self, observations: &ObservationSet) -> SdmResult<Array2<f64>> {
        self.log_likelihood_matrix_with(observations, &SequentialBackend)
    }

    /// `k × n` matrix of per-component log-densities
    ///
    /// Entry `(c, i)` is
    /// `-0.5 * sum_j (x_ij - mu_cj)^2 / var_cj - 0.5 * sum_j ln(2 pi var_cj)`
    /// with every variance floored at [`VARIANCE_FLOOR`].
    pub fn log_likelihood_matrix_with(
        &self,
        observations: &ObservationSet,
        backend: &dyn ExecutionBackend,
    ) -> SdmResult<Array2<f64>> {
        observations.ensure_dim(self.n_features())?;

        let k = self.n_components();
        let means = &self.params.means;
        let variances = self.params.variances.mapv(floor_variance);

        // Normalizing term of each component, summed in log space
        let log_norms: Array1<f64> = variances
            .axis_iter(Axis(0))
            .map(|row| -0.5 * row.iter().map(|&v| (2.0 * PI * v).ln()).sum::<f64>())
            .collect();

        let data = observations.view();
        let mut matrix = Array2::zeros((k, observations.len()));

        backend.for_each_column(&mut matrix, &|i, mut column| {
            let x = data.row(i);
            for c in 0..k {
                let mahalanobis: f64 = x
                    .iter()
                    .zip(means.row(c).iter())
                    .zip(variances.row(c).iter())
                    .map(|((&xj, &mu), &var)| (xj - mu).powi(2) / var)
                    .sum();
                column[c] = -0.5 * mahalanobis + log_norms[c];
            }
        });

        Ok(matrix)
    }

    /// Responsibilities with the start weights applied as a per-sample prior
    pub fn posterior_with(&self, observations: &ObservationSet, backend: &dyn ExecutionBackend) -> SdmResult<Posterior> {
        let mut weighted = self.log_likelihood_matrix_with(observations, backend)?;
        let log_weights = self.params.start_weights.mapv(f64::ln);

        backend.for_each_column(&mut weighted, &|_, mut column| {
            column += &log_weights;
        });

        let log_evidence = backend.reduce_columns(weighted.view(), &|_, column| log_sum_exp(column));

        backend.for_each_column(&mut weighted, &|i, mut column| {
            let norm = log_evidence[i];
            column.mapv_inplace(|v| (v - norm).exp());
        });

        Ok(Posterior {
            responsibilities: weighted,
            log_evidence,
        })
    }

    /// Total log-likelihood of `observations` under the current mixture
    pub fn score(&self, observations: &ObservationSet) -> SdmResult<f64> {
        Ok(self.posterior_with(observations, &SequentialBackend)?.total_log_likelihood())
    }
}

/// Raise `variance` to [`VARIANCE_FLOOR`]; NaN passes through unchanged
pub(crate) fn floor_variance(variance: f64) -> f64 {
    if variance < VARIANCE_FLOOR {
        VARIANCE_FLOOR
    } else {
        variance
    }
}

/// Exponentiate then divide by the sum; shifted by the max for stability
pub(crate) fn softmax(values: &Array1<f64>) -> Array1<f64> {
    let max = values.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let exps = values.mapv(|v| (v - max).exp());
    let sum = exps.sum();
    exps / sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ParallelBackend;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use sdm_core::SdmError;

    fn two_component_state() -> GaussianMixtureState {
        GaussianMixtureState::from_parameters(MixtureParameters {
            means: array![[0.0], [10.0]],
            variances: array![[1.0], [4.0]],
            start_weights: array![0.25, 0.75],
            transition_matrix: array![[0.5, 0.5], [0.5, 0.5]],
        })
        .unwrap()
    }

    #[test]
    fn test_initialize_invariants() {
        let mut rng = StdRng::seed_from_u64(7);
        let state = GaussianMixtureState::initialize(5, 3, &mut rng).unwrap();
        let params = state.parameters();

        assert_eq!(params.means.dim(), (5, 3));
        assert_abs_diff_eq!(params.start_weights.sum(), 1.0, epsilon = 1e-6);
        assert!(params.start_weights.iter().all(|&w| w > 0.0));
        assert!(params.variances.iter().all(|&v| v >= VARIANCE_FLOOR));
        assert!(params.variances.iter().all(|&v| v == 1.0));

        for row in params.transition_matrix.axis_iter(Axis(0)) {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-9);
        }
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_initialize_is_seeded() {
        let a = GaussianMixtureState::initialize(4, 2, &mut StdRng::seed_from_u64(11)).unwrap();
        let b = GaussianMixtureState::initialize(4, 2, &mut StdRng::seed_from_u64(11)).unwrap();
        let c = GaussianMixtureState::initialize(4, 2, &mut StdRng::seed_from_u64(12)).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_initialize_rejects_zero_sizes() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            GaussianMixtureState::initialize(0, 1, &mut rng),
            Err(SdmError::InvalidDimension { .. })
        ));
        assert!(matches!(
            GaussianMixtureState::initialize(2, 0, &mut rng),
            Err(SdmError::InvalidDimension { .. })
        ));
    }

    #[test]
    fn test_log_likelihood_values() {
        let state = two_component_state();
        let observations = ObservationSet::from_samples(&[0.0, 10.0]).unwrap();
        let matrix = state.log_likelihood_matrix(&observations).unwrap();

        assert_eq!(matrix.dim(), (2, 2));

        let half_log_two_pi = 0.5 * (2.0 * PI).ln();
        assert_relative_eq!(matrix[[0, 0]], -half_log_two_pi);
        assert_relative_eq!(matrix[[0, 1]], -50.0 - half_log_two_pi);
        assert_relative_eq!(matrix[[1, 0]], -0.5 * 25.0 - 0.5 * (8.0 * PI).ln());
        assert_relative_eq!(matrix[[1, 1]], -0.5 * (8.0 * PI).ln());
    }

    #[test]
    fn test_log_likelihood_floors_variance() {
        let state = GaussianMixtureState::from_parameters(MixtureParameters {
            means: array![[1.0]],
            variances: array![[1e-300]],
            start_weights: array![1.0],
            transition_matrix: array![[1.0]],
        })
        .unwrap();
        let observations = ObservationSet::from_samples(&[1.0, 1.001]).unwrap();
        let matrix = state.log_likelihood_matrix(&observations).unwrap();

        assert!(matrix.iter().all(|v| v.is_finite()));
        assert_relative_eq!(matrix[[0, 0]], -0.5 * (2.0 * PI * VARIANCE_FLOOR).ln());
    }

    #[test]
    fn test_multivariate_log_likelihood() {
        let state = GaussianMixtureState::from_parameters(MixtureParameters {
            means: array![[0.0, 1.0]],
            variances: array![[1.0, 2.0]],
            start_weights: array![1.0],
            transition_matrix: array![[1.0]],
        })
        .unwrap();
        let observations = ObservationSet::from_rows(&[vec![1.0, 3.0]]).unwrap();
        let matrix = state.log_likelihood_matrix(&observations).unwrap();

        let expected = -0.5 * (1.0 + 4.0 / 2.0) - 0.5 * ((2.0 * PI).ln() + (4.0 * PI).ln());
        assert_relative_eq!(matrix[[0, 0]], expected);
    }

    #[test]
    fn test_dimension_mismatch() {
        let state = two_component_state();
        let observations = ObservationSet::from_rows(&[vec![1.0, 2.0]]).unwrap();
        assert!(matches!(
            state.log_likelihood_matrix(&observations),
            Err(SdmError::InvalidDimension { .. })
        ));
    }

    #[test]
    fn test_posterior_columns_on_simplex() {
        let state = two_component_state();
        let observations = ObservationSet::from_samples(&[-3.0, 0.0, 4.0, 5.0, 9.0, 250.0]).unwrap();

        for backend in [&SequentialBackend as &dyn ExecutionBackend, &ParallelBackend::new()] {
            let posterior = state.posterior_with(&observations, backend).unwrap();
            for column in posterior.responsibilities.axis_iter(Axis(1)) {
                assert_abs_diff_eq!(column.sum(), 1.0, epsilon = 1e-6);
                assert!(column.iter().all(|&r| (0.0..=1.0).contains(&r)));
            }
        }
    }

    #[test]
    fn test_score_matches_posterior() {
        let state = two_component_state();
        let observations = ObservationSet::from_samples(&[0.5, 9.5]).unwrap();
        let posterior = state.posterior_with(&observations, &SequentialBackend).unwrap();

        assert_relative_eq!(state.score(&observations).unwrap(), posterior.total_log_likelihood());
        assert!(posterior.total_log_likelihood() < 0.0);
    }

    #[test]
    fn test_from_parameters_validation() {
        let mut params = two_component_state().into_parameters();
        params.start_weights = array![0.5, 0.6];
        assert!(GaussianMixtureState::from_parameters(params.clone()).is_err());

        params.start_weights = array![0.5, 0.5];
        params.variances = array![[0.0], [1.0]];
        assert!(GaussianMixtureState::from_parameters(params.clone()).is_err());

        params.variances = array![[1.0], [1.0]];
        params.means = array![[0.0, 1.0], [1.0, 2.0]];
        assert!(GaussianMixtureState::from_parameters(params).is_err());
    }

    #[test]
    fn test_floor_variance_keeps_nan() {
        assert_eq!(floor_variance(0.0), VARIANCE_FLOOR);
        assert_eq!(floor_variance(-3.0), VARIANCE_FLOOR);
        assert_eq!(floor_variance(2.5), 2.5);
        assert!(floor_variance(f64::NAN).is_nan());
    }

    #[test]
    fn test_nan_variance_is_not_finite() {
        let mut params = two_component_state().into_parameters();
        params.variances[[1, 0]] = f64::NAN;
        assert!(!params.is_finite());

        let state = GaussianMixtureState { params };
        let observations = ObservationSet::from_samples(&[0.0, 10.0]).unwrap();
        let matrix = state.log_likelihood_matrix(&observations).unwrap();
        assert!(matrix.row(1).iter().all(|v| v.is_nan()));
        assert!(matrix.row(0).iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_softmax() {
        let weights = softmax(&array![0.0, 2.0f64.ln()]);
        assert_relative_eq!(weights[0], 1.0 / 3.0);
        assert_relative_eq!(weights[1], 2.0 / 3.0);
    }
}
