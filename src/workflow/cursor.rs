use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Position inside an adopted workflow plan.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionCursor {
    pub index: usize,
    /// Recorded output per finished step id
    #[serde(default)]
    pub results: BTreeMap<String, Value>,
    /// Whether the step at `index` has run and written its output
    #[serde(default)]
    pub step_completed: bool,
}

impl ExecutionCursor {
    pub fn start() -> Self {
        Self::default()
    }
}
