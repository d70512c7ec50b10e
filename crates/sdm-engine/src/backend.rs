//! Execution backends for the dense per-sample and per-component kernels
//!
//! Every kernel the engine runs is independent across matrix columns
//! (samples) or rows (components). A backend decides how those lanes are
//! scheduled. Each lane is always reduced in the same order, so every
//! backend produces bit-identical results for the same inputs.

use ndarray::parallel::prelude::*;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis};
use sdm_core::{SdmError, SdmResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Kernel applied to one mutable lane (row or column) with its index
pub type LaneKernel<'a> = dyn for<'v> Fn(usize, ArrayViewMut1<'v, f64>) + Sync + 'a;

/// Kernel reducing one read-only lane to a scalar
pub type LaneReducer<'a> = dyn for<'v> Fn(usize, ArrayView1<'v, f64>) -> f64 + Sync + 'a;

/// Available backend implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// Single-threaded loops on the calling thread
    Sequential,
    /// Multi-threaded via rayon
    Parallel,
}

/// Strategy for running dense matrix kernels
pub trait ExecutionBackend: Send + Sync + fmt::Debug {
    /// Which implementation this is
    fn kind(&self) -> BackendKind;

    /// Apply `kernel` to every column of `matrix`
    fn for_each_column(&self, matrix: &mut Array2<f64>, kernel: &LaneKernel<'_>);

    /// Apply `kernel` to every row of `matrix`
    fn for_each_row(&self, matrix: &mut Array2<f64>, kernel: &LaneKernel<'_>);

    /// Reduce every column of `matrix` to one value
    fn reduce_columns(&self, matrix: ArrayView2<'_, f64>, reducer: &LaneReducer<'_>) -> Array1<f64>;

    /// Row index of the largest entry in every column
    fn argmax_columns(&self, matrix: ArrayView2<'_, f64>) -> Vec<usize>;
}

/// Runs every kernel on the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialBackend;

impl ExecutionBackend for SequentialBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sequential
    }

    fn for_each_column(&self, matrix: &mut Array2<f64>, kernel: &LaneKernel<'_>) {
        for (index, column) in matrix.axis_iter_mut(Axis(1)).enumerate() {
            kernel(index, column);
        }
    }

    fn for_each_row(&self, matrix: &mut Array2<f64>, kernel: &LaneKernel<'_>) {
        for (index, row) in matrix.axis_iter_mut(Axis(0)).enumerate() {
            kernel(index, row);
        }
    }

    fn reduce_columns(&self, matrix: ArrayView2<'_, f64>, reducer: &LaneReducer<'_>) -> Array1<f64> {
        matrix
            .axis_iter(Axis(1))
            .enumerate()
            .map(|(index, column)| reducer(index, column))
            .collect()
    }

    fn argmax_columns(&self, matrix: ArrayView2<'_, f64>) -> Vec<usize> {
        matrix.axis_iter(Axis(1)).map(argmax).collect()
    }
}

/// Splits lanes across a rayon thread pool
pub struct ParallelBackend {
    pool: Option<rayon::ThreadPool>,
}

impl ParallelBackend {
    /// Use rayon's global pool
    pub fn new() -> Self {
        ParallelBackend { pool: None }
    }

    /// Use a dedicated pool with `threads` workers
    pub fn with_threads(threads: usize) -> SdmResult<Self> {
        if threads == 0 {
            return Err(SdmError::ConfigurationError {
                message: "Thread count must be greater than 0".to_string(),
            });
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| SdmError::ConfigurationError {
                message: format!("Failed to build thread pool: {}", e),
            })?;

        Ok(ParallelBackend { pool: Some(pool) })
    }

    /// Worker threads available to kernels
    pub fn threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

impl Default for ParallelBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ParallelBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelBackend")
            .field("threads", &self.threads())
            .field("dedicated_pool", &self.pool.is_some())
            .finish()
    }
}

impl ExecutionBackend for ParallelBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Parallel
    }

    fn for_each_column(&self, matrix: &mut Array2<f64>, kernel: &LaneKernel<'_>) {
        self.install(|| {
            matrix
                .axis_iter_mut(Axis(1))
                .into_par_iter()
                .enumerate()
                .for_each(|(index, column)| kernel(index, column));
        });
    }

    fn for_each_row(&self, matrix: &mut Array2<f64>, kernel: &LaneKernel<'_>) {
        self.install(|| {
            matrix
                .axis_iter_mut(Axis(0))
                .into_par_iter()
                .enumerate()
                .for_each(|(index, row)| kernel(index, row));
        });
    }

    fn reduce_columns(&self, matrix: ArrayView2<'_, f64>, reducer: &LaneReducer<'_>) -> Array1<f64> {
        let values: Vec<f64> = self.install(|| {
            matrix
                .axis_iter(Axis(1))
                .into_par_iter()
                .enumerate()
                .map(|(index, column)| reducer(index, column))
                .collect()
        });
        Array1::from(values)
    }

    fn argmax_columns(&self, matrix: ArrayView2<'_, f64>) -> Vec<usize> {
        self.install(|| matrix.axis_iter(Axis(1)).into_par_iter().map(argmax).collect())
    }
}

/// Build a backend of the requested kind
///
/// `threads` only applies to the parallel backend; `None` shares rayon's
/// global pool.
pub fn create_backend(kind: BackendKind, threads: Option<usize>) -> SdmResult<Arc<dyn ExecutionBackend>> {
    match kind {
        BackendKind::Sequential => Ok(Arc::new(SequentialBackend)),
        BackendKind::Parallel => match threads {
            Some(threads) => Ok(Arc::new(ParallelBackend::with_threads(threads)?)),
            None => Ok(Arc::new(ParallelBackend::new())),
        },
    }
}

/// First index holding the maximum; NaN entries never win
pub(crate) fn argmax(lane: ArrayView1<'_, f64>) -> usize {
    let mut best_index = 0;
    let mut best_value = f64::NEG_INFINITY;

    for (index, &value) in lane.iter().enumerate() {
        if value > best_value {
            best_value = value;
            best_index = index;
        }
    }

    best_index
}

/// Numerically stable `ln(sum(exp(v)))`
pub(crate) fn log_sum_exp(lane: ArrayView1<'_, f64>) -> f64 {
    let max = lane.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if !max.is_finite() {
        return max;
    }

    let sum: f64 = lane.iter().map(|&v| (v - max).exp()).sum();
    max + sum.ln()
}
