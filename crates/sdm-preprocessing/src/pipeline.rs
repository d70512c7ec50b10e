//! Signal processing pipeline for chaining processors

use crate::config::PreprocessingConfig;
use crate::normalization::{Detrender, Standardizer};
use crate::outliers::OutlierInterpolator;
use crate::processor::{ProcessingMetrics, SignalProcessor};
use sdm_core::{SdmError, SdmResult, Signal};
use std::time::Instant;
use tracing::{info, warn};

/// Processing pipeline that chains multiple processors
pub struct Pipeline {
    name: String,
    processors: Vec<Box<dyn SignalProcessor>>,
    processing_metrics: Vec<ProcessingMetrics>,
    bypass_enabled: bool,
}

/// Pipeline builder for constructing processing chains
pub struct PipelineBuilder {
    name: String,
    processors: Vec<Box<dyn SignalProcessor>>,
    bypass_enabled: bool,
}

/// Pipeline execution result with per-processor metrics
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub output_signal: Signal,
    pub processing_metrics: Vec<ProcessingMetrics>,
    pub total_latency_us: u64,
    /// Indices flagged by any processor (sorted, deduplicated)
    pub flagged_indices: Vec<usize>,
    pub warnings: Vec<String>,
}

impl Pipeline {
    /// Create new empty pipeline
    pub fn new(name: &str) -> Self {
        Pipeline {
            name: name.to_string(),
            processors: Vec::new(),
            processing_metrics: Vec::new(),
            bypass_enabled: false,
        }
    }

    /// Build the processor chain described by `config`
    pub fn from_config(config: &PreprocessingConfig) -> SdmResult<Self> {
        config.validate()?;

        let mut builder = PipelineBuilder::new("Preprocessing");
        if config.interpolate_outliers {
            builder = builder.add_processor(Box::new(OutlierInterpolator::new(
                config.outlier_window,
                config.outlier_threshold,
            )?));
        }
        if config.standardize {
            builder = builder.add_processor(Box::new(Standardizer::new()));
        }
        if config.detrend {
            builder = builder.add_processor(Box::new(Detrender::new()));
        }

        Ok(builder.build())
    }

    /// Outlier interpolation, standardization, then detrending
    pub fn standard() -> SdmResult<Self> {
        Self::from_config(&PreprocessingConfig::default())
    }

    /// Add processor to pipeline
    pub fn add_processor(&mut self, processor: Box<dyn SignalProcessor>) {
        self.processors.push(processor);
    }

    /// Process signal through the entire pipeline
    pub fn process(&mut self, input: &Signal) -> SdmResult<PipelineResult> {
        if input.is_empty() {
            return Err(SdmError::InvalidSignalData {
                reason: "signal contains no samples".to_string(),
            });
        }
        if let Some(index) = input.first_non_finite() {
            return Err(SdmError::InvalidSignalData {
                reason: format!("non-finite sample at index {}", index),
            });
        }

        let start_time = Instant::now();
        let mut current_signal = input.clone();
        let mut all_metrics = Vec::with_capacity(self.processors.len());
        let mut flagged_indices = Vec::new();
        let mut warnings = Vec::new();

        for processor in self.processors.iter_mut() {
            let timer = ProcessingMetrics::start_timing(processor.name());

            match processor.process(&current_signal) {
                Ok(processed_signal) => {
                    current_signal = processed_signal;
                    flagged_indices.extend_from_slice(processor.flagged_indices());
                    all_metrics.push(timer.finish(processor.samples_modified()));
                }
                Err(e) => {
                    all_metrics.push(timer.finish_with_error(&e.to_string()));

                    if self.bypass_enabled {
                        warn!(processor = processor.name(), error = %e, "bypassing failed processor");
                        warnings.push(format!(
                            "Processor '{}' failed: {}, bypassing",
                            processor.name(),
                            e
                        ));
                    } else {
                        self.processing_metrics = all_metrics;
                        return Err(e);
                    }
                }
            }
        }

        flagged_indices.sort_unstable();
        flagged_indices.dedup();

        let total_latency = start_time.elapsed().as_micros() as u64;
        info!(
            pipeline = %self.name,
            samples = current_signal.len(),
            flagged = flagged_indices.len(),
            latency_us = total_latency,
            "preprocessing complete"
        );

        // Store metrics for later analysis
        self.processing_metrics = all_metrics.clone();

        Ok(PipelineResult {
            output_signal: current_signal,
            processing_metrics: all_metrics,
            total_latency_us: total_latency,
            flagged_indices,
            warnings,
        })
    }

    /// Enable/disable bypass mode (continue on processor errors)
    pub fn set_bypass_enabled(&mut self, enabled: bool) {
        self.bypass_enabled = enabled;
    }

    /// Metrics from the most recent run
    pub fn last_metrics(&self) -> &[ProcessingMetrics] {
        &self.processing_metrics
    }

    /// Reset all processors in the pipeline
    pub fn reset(&mut self) {
        for processor in &mut self.processors {
            processor.reset();
        }
        self.processing_metrics.clear();
    }

    /// Get list of all processor names
    pub fn processor_names(&self) -> Vec<String> {
        self.processors.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PipelineBuilder {
    /// Create new pipeline builder
    pub fn new(name: &str) -> Self {
        PipelineBuilder {
            name: name.to_string(),
            processors: Vec::new(),
            bypass_enabled: false,
        }
    }

    /// Append a processor to the chain
    pub fn add_processor(mut self, processor: Box<dyn SignalProcessor>) -> Self {
        self.processors.push(processor);
        self
    }

    /// Continue past failing processors instead of aborting
    pub fn bypass_on_error(mut self, enabled: bool) -> Self {
        self.bypass_enabled = enabled;
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Pipeline {
        Pipeline {
            name: self.name,
            processors: self.processors,
            processing_metrics: Vec::new(),
            bypass_enabled: self.bypass_enabled,
        }
    }
}
