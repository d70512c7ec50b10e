//! SDM-Core: Foundation types for hidden-state discovery
//!
//! Observation sets, label sequences, the single-channel signal container
//! shared with the preprocessing stage, and the framework error type.

pub mod error;
pub mod labels;
pub mod observation;
pub mod signal;

pub use error::{SdmError, SdmResult};
pub use labels::{LabelSegment, LabelSequence};
pub use observation::ObservationSet;
pub use signal::{Signal, SignalStats};
