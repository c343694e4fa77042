//! Property-based tests for plan validation, continuation, the gate and batching

mod batch_props;
mod gate_props;
mod workflow_props;
