//! Workflow domain: multi-step plans, their validation and step-by-step continuation.

pub mod continuation;
pub mod cursor;
pub mod plan;
pub mod validator;

pub use continuation::{Advance, ContinuationEngine, NextStep};
pub use cursor::ExecutionCursor;
pub use plan::{WorkflowPlan, WorkflowStep};
pub use validator::{PlanDefect, WorkflowValidator};
