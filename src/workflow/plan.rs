use crate::capability::CapabilityId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One step of a multi-step workflow. Immutable once the plan is adopted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    #[serde(alias = "step_id")]
    pub id: String,
    #[serde(alias = "capability", alias = "agent")]
    pub target: CapabilityId,
    #[serde(default, alias = "description")]
    pub task: String,
    #[serde(default, alias = "dependencies", alias = "deps")]
    pub depends_on: Vec<String>,
    /// Input parameter name to session-state field name
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,
    /// Session-state field the step writes; defaults to the capability's primary output
    #[serde(default, alias = "output_field")]
    pub output: Option<String>,
}

impl WorkflowStep {
    pub fn new(id: impl Into<String>, target: CapabilityId, task: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            target,
            task: task.into(),
            depends_on: Vec::new(),
            inputs: BTreeMap::new(),
            output: None,
        }
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_input(mut self, param: impl Into<String>, field: impl Into<String>) -> Self {
        self.inputs.insert(param.into(), field.into());
        self
    }

    pub fn with_output(mut self, field: impl Into<String>) -> Self {
        self.output = Some(field.into());
        self
    }
}

/// Ordered multi-step decomposition of a request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkflowPlan {
    pub steps: Vec<WorkflowStep>,
    #[serde(default, alias = "reasoning")]
    pub rationale: String,
    #[serde(default, alias = "message")]
    pub status: String,
    #[serde(default)]
    pub estimated_steps: Option<usize>,
}

impl WorkflowPlan {
    pub fn new(steps: Vec<WorkflowStep>) -> Self {
        let estimated = steps.len();
        Self {
            steps,
            rationale: String::new(),
            status: String::new(),
            estimated_steps: Some(estimated),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, index: usize) -> Option<&WorkflowStep> {
        self.steps.get(index)
    }
}
