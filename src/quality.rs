//! Quality domain: reviewer records, refiner output and the bounded gate.

pub mod gate;
pub mod record;
pub mod refinement;

pub use gate::{GateOutcome, GatePhase, GateState, QualityGate, ReviewContext};
pub use record::{QualityIssue, QualityRecord, Severity, SYSTEM_CATEGORY};
pub use refinement::RefinerOutput;
