//! ObservationSet: ordered, immutable feature vectors fed to the model

use crate::error::SdmResult;
use crate::dimension_error;
use crate::signal::Signal;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use num_traits::Float;
use serde::{Deserialize, Serialize};

/// Ordered sequence of `n` observations sharing dimensionality `d`.
///
/// Stored as an `n × d` matrix, one row per observation. The set is never
/// mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationSet {
    data: Array2<f64>,
}

impl ObservationSet {
    /// Build a one-dimensional set from scalar samples (f32 or f64)
    pub fn from_samples<T: Float>(samples: &[T]) -> SdmResult<Self> {
        let mut values = Vec::with_capacity(samples.len());
        for (i, sample) in samples.iter().enumerate() {
            let value = sample
                .to_f64()
                .ok_or_else(|| dimension_error!("sample {} is not representable as f64", i))?;
            values.push(value);
        }

        let n = values.len();
        let data = Array2::from_shape_vec((n, 1), values)
            .map_err(|e| dimension_error!("cannot shape {} samples: {}", n, e))?;
        Self::from_array(data)
    }

    /// Build a set from row vectors of identical length
    pub fn from_rows(rows: &[Vec<f64>]) -> SdmResult<Self> {
        let d = rows.first().map(|row| row.len()).unwrap_or(0);

        let mut flat = Vec::with_capacity(rows.len() * d);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != d {
                return Err(dimension_error!(
                    "observation {} has {} features, expected {}",
                    i,
                    row.len(),
                    d
                ));
            }
            flat.extend_from_slice(row);
        }

        let data = Array2::from_shape_vec((rows.len(), d), flat)
            .map_err(|e| dimension_error!("cannot shape observation rows: {}", e))?;
        Self::from_array(data)
    }

    /// Wrap an existing `n × d` matrix
    pub fn from_array(data: Array2<f64>) -> SdmResult<Self> {
        if data.nrows() == 0 {
            return Err(dimension_error!("observation set must contain at least one sample"));
        }
        if data.ncols() == 0 {
            return Err(dimension_error!("observations must have at least one feature"));
        }
        Ok(ObservationSet { data })
    }

    /// One-dimensional set from a preprocessed signal
    pub fn from_signal(signal: &Signal) -> SdmResult<Self> {
        Self::from_samples(signal.samples())
    }

    /// Number of observations (`n`)
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    /// Always false; empty sets cannot be constructed
    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    /// Feature dimensionality (`d`)
    pub fn dim(&self) -> usize {
        self.data.ncols()
    }

    /// Feature vector of observation `index`
    pub fn observation(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        if index < self.len() {
            Some(self.data.index_axis(Axis(0), index))
        } else {
            None
        }
    }

    /// Borrow the underlying `n × d` matrix
    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    /// Iterate observations in order
    pub fn iter(&self) -> impl Iterator<Item = ArrayView1<'_, f64>> {
        self.data.axis_iter(Axis(0))
    }

    /// Fail unless the set has exactly `expected` features
    pub fn ensure_dim(&self, expected: usize) -> SdmResult<()> {
        if self.dim() != expected {
            return Err(dimension_error!(
                "observations have {} features, model expects {}",
                self.dim(),
                expected
            ));
        }
        Ok(())
    }
}
