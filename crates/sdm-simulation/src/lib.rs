//! SDM-Simulation: synthetic regime-switching signals
//!
//! Generates physiological-like traces with known hidden states for
//! testing and development.

pub mod regimes;
pub mod simulator;

pub use regimes::*;
pub use simulator::*;
