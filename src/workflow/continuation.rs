//! Step continuation: moves an adopted plan forward one step at a time.

use crate::capability::{CapabilityId, CapabilityRegistry};
use crate::session::SessionState;
use crate::workflow::cursor::ExecutionCursor;
use crate::workflow::plan::{WorkflowPlan, WorkflowStep};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Step to dispatch next.
#[derive(Debug, Clone, PartialEq)]
pub struct NextStep {
    pub step_id: String,
    pub target: CapabilityId,
    pub task: String,
    /// Session field the reply is written to
    pub output: String,
    /// Resolved input parameters
    pub inputs: BTreeMap<String, Value>,
    pub status: String,
}

/// Result of advancing a plan.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Next(NextStep),
    PlanComplete {
        status: String,
        /// Set when the plan was abandoned rather than finished
        error: Option<String>,
    },
}

impl Advance {
    pub fn is_complete(&self) -> bool {
        matches!(self, Advance::PlanComplete { .. })
    }
}

/// Advances session plans. Holds a shared registry handle for the defensive target check.
#[derive(Debug, Clone)]
pub struct ContinuationEngine {
    registry: Arc<CapabilityRegistry>,
}

impl ContinuationEngine {
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self { registry }
    }

    /// Record the finished step's output and move the cursor to the next step.
    ///
    /// Clears the plan when it runs out of steps or when the next target is not registered.
    pub fn advance(&self, state: &mut SessionState) -> Advance {
        let Some(plan) = state.plan.take() else {
            state.cursor = None;
            return Advance::PlanComplete {
                status: "no active workflow".to_string(),
                error: None,
            };
        };
        let mut cursor = state.cursor.take().unwrap_or_default();

        if let Some(finished) = plan.step(cursor.index) {
            let output = state
                .field(&self.output_field(finished))
                .cloned()
                .unwrap_or(Value::Null);
            cursor.results.insert(finished.id.clone(), output);
        }

        let next_index = cursor.index + 1;
        let total = plan.len();
        if next_index >= total {
            let status = format!("workflow complete: {} steps finished", total);
            info!(session_id = %state.session_id, steps = total, "Workflow complete");
            state.status = status.clone();
            return Advance::PlanComplete {
                status,
                error: None,
            };
        }

        let step = &plan.steps[next_index];
        if !self.registry.contains(&step.target) {
            let error = format!(
                "step '{}' targets unregistered capability '{}'",
                step.id, step.target
            );
            warn!(session_id = %state.session_id, step_id = %step.id, "Workflow abandoned: {}", error);
            state.status = format!("workflow stopped: {}", error);
            return Advance::PlanComplete {
                status: state.status.clone(),
                error: Some(error),
            };
        }

        cursor.index = next_index;
        cursor.step_completed = false;
        let next = self.next_step(&plan, next_index, step, &cursor, state);
        debug!(
            session_id = %state.session_id,
            step_id = %next.step_id,
            target = %next.target,
            "Advanced workflow"
        );
        state.status = next.status.clone();
        state.plan = Some(plan);
        state.cursor = Some(cursor);
        Advance::Next(next)
    }

    /// Step under the cursor, without mutating anything
    pub fn current(&self, state: &SessionState) -> Option<NextStep> {
        let (plan, cursor) = state.active_plan()?;
        let step = plan.step(cursor.index)?;
        Some(self.next_step(plan, cursor.index, step, cursor, state))
    }

    /// Field a step writes: its declared output, else the capability's primary output
    pub fn output_field(&self, step: &WorkflowStep) -> String {
        if let Some(output) = &step.output {
            return output.clone();
        }
        self.registry
            .get(&step.target)
            .and_then(|descriptor| descriptor.primary_output())
            .unwrap_or(step.id.as_str())
            .to_string()
    }

    fn next_step(
        &self,
        plan: &WorkflowPlan,
        index: usize,
        step: &WorkflowStep,
        cursor: &ExecutionCursor,
        state: &SessionState,
    ) -> NextStep {
        NextStep {
            step_id: step.id.clone(),
            target: step.target.clone(),
            task: step.task.clone(),
            output: self.output_field(step),
            inputs: Self::resolve_inputs(step, cursor, state),
            status: format!("step {}/{}: {}", index + 1, plan.len(), step.task),
        }
    }

    /// Map a step's input parameters onto session fields, falling back to recorded results
    pub fn resolve_inputs(
        step: &WorkflowStep,
        cursor: &ExecutionCursor,
        state: &SessionState,
    ) -> BTreeMap<String, Value> {
        step.inputs
            .iter()
            .map(|(param, field)| {
                let value = state
                    .field(field)
                    .or_else(|| cursor.results.get(field))
                    .cloned()
                    .unwrap_or(Value::Null);
                (param.clone(), value)
            })
            .collect()
    }
}
