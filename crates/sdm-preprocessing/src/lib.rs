//! SDM-Preprocessing: signal cleaning ahead of state discovery
//!
//! Outlier interpolation, standardization and detrending, chained into a
//! pipeline that hands a clean signal to the model.

pub mod config;
pub mod normalization;
pub mod outliers;
pub mod pipeline;
pub mod processor;

pub use config::PreprocessingConfig;
pub use normalization::{Detrender, Standardizer};
pub use outliers::OutlierInterpolator;
pub use pipeline::{Pipeline, PipelineBuilder, PipelineResult};
pub use processor::{ProcessingMetrics, SignalProcessor};
