//! Decision payloads returned by the decision-making capability.

use crate::router::extract::extract_payload;
use crate::workflow::{WorkflowPlan, WorkflowStep};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Route the turn to one target.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SingleDecision {
    #[serde(default, alias = "reasoning")]
    pub rationale: String,
    #[serde(alias = "target", alias = "next_agent")]
    pub next: String,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
    #[serde(default, alias = "message")]
    pub status: String,
}

/// Decompose the request into a workflow.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MultiDecision {
    #[serde(default, alias = "reasoning")]
    pub rationale: String,
    #[serde(alias = "workflow")]
    pub steps: Vec<WorkflowStep>,
    #[serde(default, alias = "message")]
    pub status: String,
    #[serde(default)]
    pub estimated_steps: Option<usize>,
}

impl MultiDecision {
    pub fn into_plan(self) -> WorkflowPlan {
        let estimated = self.estimated_steps.unwrap_or(self.steps.len());
        WorkflowPlan {
            steps: self.steps,
            rationale: self.rationale,
            status: self.status,
            estimated_steps: Some(estimated),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Multi(MultiDecision),
    Single(SingleDecision),
}

/// Decoded decision.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Single(SingleDecision),
    Multi(MultiDecision),
    /// Carries the reason the reply was rejected
    Unparsable(String),
}

impl Decision {
    /// Strip wrapping, then decode strictly against the single- or multi-step schema.
    pub fn parse(reply: &str) -> Decision {
        let Some(payload) = extract_payload(reply) else {
            return Decision::Unparsable("no JSON object in reply".to_string());
        };
        match serde_json::from_str::<Payload>(payload) {
            Ok(Payload::Multi(multi)) => Decision::Multi(multi),
            Ok(Payload::Single(single)) if single.next.trim().is_empty() => {
                Decision::Unparsable("empty target".to_string())
            }
            Ok(Payload::Single(single)) => Decision::Single(single),
            Err(err) => Decision::Unparsable(err.to_string()),
        }
    }
}
