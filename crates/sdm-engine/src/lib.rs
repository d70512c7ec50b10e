//! SDM-Engine: hidden-state discovery with Gaussian mixtures
//!
//! Diagonal-covariance mixture parameters, an EM trainer that alternates
//! E- and M-steps for a fixed number of iterations, and a per-sample
//! decoder. Matrix kernels run on an [`ExecutionBackend`], sequential or
//! multi-threaded, with identical results.

pub mod backend;
pub mod config;
pub mod decoder;
pub mod mixture;
pub mod model;
pub mod trainer;

pub use backend::{create_backend, BackendKind, ExecutionBackend, ParallelBackend, SequentialBackend};
pub use config::EngineConfig;
pub use decoder::StateDecoder;
pub use mixture::{GaussianMixtureState, MixtureParameters, Posterior, VARIANCE_FLOOR};
pub use model::StateDiscoveryModel;
pub use trainer::{EMTrainer, FitReport, FitWarning, OCCUPANCY_FLOOR};
