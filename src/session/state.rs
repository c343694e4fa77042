use crate::batch::BatchCursor;
use crate::capability::{CapabilityId, RouteTarget};
use crate::quality::GateState;
use crate::workflow::{ExecutionCursor, WorkflowPlan};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

/// Capability failure recorded on the session instead of being raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFault {
    pub capability: String,
    pub message: String,
    /// Revision of the last state written before the failure
    pub last_good_revision: u64,
}

/// Durable per-session state. Exclusively owned by its session; checkpointed after every
/// mutating step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    #[serde(default)]
    pub plan: Option<WorkflowPlan>,
    #[serde(default)]
    pub cursor: Option<ExecutionCursor>,
    /// Target set by the caller ahead of routing (direct UI action)
    #[serde(default)]
    pub stamped_target: Option<CapabilityId>,
    /// Target chosen by the last routing decision
    #[serde(default)]
    pub target: Option<RouteTarget>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub selections: BTreeMap<String, String>,
    /// Capability outputs, keyed by declared output field
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    #[serde(default)]
    pub turns: Vec<ConversationTurn>,
    #[serde(default)]
    pub quality: Option<GateState>,
    #[serde(default)]
    pub batch: Option<BatchCursor>,
    #[serde(default)]
    pub fault: Option<SessionFault>,
    #[serde(default)]
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            plan: None,
            cursor: None,
            stamped_target: None,
            target: None,
            status: String::new(),
            rationale: String::new(),
            action: None,
            parameters: BTreeMap::new(),
            stage: None,
            selections: BTreeMap::new(),
            fields: BTreeMap::new(),
            turns: Vec::new(),
            quality: None,
            batch: None,
            fault: None,
            revision: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(ConversationTurn {
            role: TurnRole::User,
            content: content.into(),
        });
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(ConversationTurn {
            role: TurnRole::Assistant,
            content: content.into(),
        });
    }

    /// Keep only the newest `limit` turns
    pub fn trim_turns(&mut self, limit: usize) {
        if self.turns.len() > limit {
            let excess = self.turns.len() - limit;
            self.turns.drain(..excess);
        }
    }

    /// Most recent user turn
    pub fn latest_utterance(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|turn| turn.role == TurnRole::User)
            .map(|turn| turn.content.as_str())
    }

    /// Active plan and cursor, when the cursor has not run off the end
    pub fn active_plan(&self) -> Option<(&WorkflowPlan, &ExecutionCursor)> {
        match (&self.plan, &self.cursor) {
            (Some(plan), Some(cursor)) if cursor.index < plan.len() => Some((plan, cursor)),
            _ => None,
        }
    }

    pub fn has_active_plan(&self) -> bool {
        self.active_plan().is_some()
    }

    pub fn clear_plan(&mut self) {
        self.plan = None;
        self.cursor = None;
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Text view of a field; strings are returned as-is, other values as JSON
    pub fn field_text(&self, name: &str) -> Option<String> {
        self.fields.get(name).map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn set_fault(&mut self, capability: &CapabilityId, message: impl Into<String>) {
        self.fault = Some(SessionFault {
            capability: capability.to_string(),
            message: message.into(),
            last_good_revision: self.revision,
        });
    }

    /// Mark a new durable revision
    pub fn touch(&mut self) {
        self.revision += 1;
        self.updated_at = Utc::now();
    }
}
