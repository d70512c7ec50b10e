//! Core signal processor trait and metrics

use sdm_core::{SdmResult, Signal};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Core trait for all signal processors
pub trait SignalProcessor: Send + Sync {
    /// Process a signal and return the processed result
    fn process(&mut self, input: &Signal) -> SdmResult<Signal>;

    /// Get processor name/identifier
    fn name(&self) -> &str;

    /// Samples changed by the most recent call (beyond uniform rescaling)
    fn samples_modified(&self) -> usize {
        0
    }

    /// Sample indices flagged by the most recent call
    fn flagged_indices(&self) -> &[usize] {
        &[]
    }

    /// Reset processor internal state
    fn reset(&mut self) {}
}

/// Performance metrics for one processing step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingMetrics {
    /// Processor that produced these metrics
    pub processor: String,
    /// Actual processing time in microseconds
    pub processing_time_us: u64,
    /// Samples changed by the processor
    pub samples_modified: usize,
    /// Success/failure status
    pub success: bool,
    /// Error message if processing failed
    pub error_message: Option<String>,
}

impl ProcessingMetrics {
    /// Start timing a processing operation
    pub fn start_timing(processor: &str) -> ProcessingTimer {
        ProcessingTimer {
            start_time: Instant::now(),
            processor: processor.to_string(),
        }
    }
}

/// Helper for timing processing operations
pub struct ProcessingTimer {
    start_time: Instant,
    processor: String,
}

impl ProcessingTimer {
    /// Finish timing and return metrics
    pub fn finish(self, samples_modified: usize) -> ProcessingMetrics {
        ProcessingMetrics {
            processor: self.processor,
            processing_time_us: self.start_time.elapsed().as_micros() as u64,
            samples_modified,
            success: true,
            error_message: None,
        }
    }

    /// Finish with error
    pub fn finish_with_error(self, error: &str) -> ProcessingMetrics {
        ProcessingMetrics {
            processor: self.processor,
            processing_time_us: self.start_time.elapsed().as_micros() as u64,
            samples_modified: 0,
            success: false,
            error_message: Some(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_processing_metrics() {
        let timer = ProcessingMetrics::start_timing("detrend");
        std::thread::sleep(Duration::from_millis(1));
        let metrics = timer.finish(12);

        assert_eq!(metrics.processor, "detrend");
        assert!(metrics.processing_time_us > 0);
        assert_eq!(metrics.samples_modified, 12);
        assert!(metrics.success);
        assert!(metrics.error_message.is_none());
    }

    #[test]
    fn test_failed_metrics() {
        let metrics = ProcessingMetrics::start_timing("outliers").finish_with_error("empty signal");
        assert!(!metrics.success);
        assert_eq!(metrics.error_message.as_deref(), Some("empty signal"));
    }
}
