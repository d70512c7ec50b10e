//! End-to-end state discovery on a simulated recording
//!
//! Simulates a regime-switching signal with artifacts, cleans it, fits the
//! mixture model on both backends and compares the decoded states with the
//! ground truth.

use anyhow::Result;
use sdm_core::ObservationSet;
use sdm_engine::{BackendKind, EngineConfig, StateDiscoveryModel};
use sdm_preprocessing::Pipeline;
use sdm_simulation::{RegimeSimulator, SimulationConfig};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== Hidden-State Discovery Demo ===\n");

    // Step 1: simulate three sleep-like regimes
    let simulation = SimulationConfig {
        seed: Some(7),
        ..SimulationConfig::from_preset("Sleep Stages")?
    };
    let n_regimes = simulation.regimes.len();
    let mut simulator = RegimeSimulator::new(simulation)?;
    let recording = simulator.generate(10_000)?;

    println!("1. Simulated recording");
    println!("   Samples: {}", recording.signal.len());
    println!("   Duration: {:.1} s", recording.signal.duration());
    println!("   Regime segments: {}", recording.labels.segments().len());
    println!("   Injected spikes: {}\n", recording.spike_indices.len());

    // Step 2: preprocess
    let mut pipeline = Pipeline::standard()?;
    let cleaned = pipeline.process(&recording.signal)?;

    println!("2. Preprocessing");
    for metrics in &cleaned.processing_metrics {
        println!(
            "   {:<22} {:>6} us  ({} samples modified)",
            metrics.processor, metrics.processing_time_us, metrics.samples_modified
        );
    }
    println!("   Outliers interpolated: {}\n", cleaned.flagged_indices.len());

    // Step 3: fit on both backends
    let observations = ObservationSet::from_signal(&cleaned.output_signal)?;
    let base = EngineConfig::default().with_components(n_regimes).with_iterations(100);

    let mut sequential = StateDiscoveryModel::new(base.clone())?;
    let (report, labels) = sequential.fit_predict(&observations)?;

    let mut parallel = StateDiscoveryModel::new(EngineConfig {
        backend: BackendKind::Parallel,
        ..base
    })?;
    let (parallel_report, parallel_labels) = parallel.fit_predict(&observations)?;

    println!("3. EM fit");
    println!("   Iterations: {}", report.iterations);
    if let Some(log_likelihood) = report.final_log_likelihood() {
        println!("   Final log-likelihood: {:.3}", log_likelihood);
    }
    println!("   Warnings: {}", report.warnings.len());
    println!("   Sequential time: {} us", report.elapsed_us);
    println!("   Parallel time:   {} us", parallel_report.elapsed_us);
    println!("   Backends agree: {}\n", labels == parallel_labels);

    // Step 4: compare with the ground truth
    println!("4. Decoded states");
    if let Some(state) = sequential.state() {
        let params = state.parameters();
        for (component, count) in labels.counts().iter().enumerate() {
            println!(
                "   State {}: mean {:>7.3}, variance {:.4}, {} samples",
                component,
                params.means[[component, 0]],
                params.variances[[component, 0]],
                count
            );
        }
    }

    for regime in 0..n_regimes {
        let mut votes = vec![0usize; n_regimes];
        for (truth, decoded) in recording.labels.iter().zip(labels.iter()) {
            if truth == regime {
                votes[decoded] += 1;
            }
        }
        let total: usize = votes.iter().sum();
        let best = votes.iter().copied().max().unwrap_or(0);
        if total > 0 {
            println!(
                "   Regime {} -> purity {:.1}%",
                regime,
                100.0 * best as f64 / total as f64
            );
        }
    }

    println!("\n=== Demo completed ===");
    Ok(())
}
