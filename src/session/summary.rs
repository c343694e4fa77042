//! Compact session summary handed to the decision-making capability.

use crate::session::state::SessionState;
use serde_json::Value;
use std::fmt::Write;

/// Render stage, selections, artifact counts and any active workflow.
///
/// `item_limit` caps how many selections are listed.
pub fn summarize(state: &SessionState, item_limit: usize) -> String {
    let mut out = String::new();

    let stage = state.stage.as_deref().unwrap_or("none");
    let _ = writeln!(out, "stage: {}", stage);

    if state.selections.is_empty() {
        let _ = writeln!(out, "selections: none");
    } else {
        let _ = writeln!(out, "selections:");
        for (key, value) in state.selections.iter().take(item_limit) {
            let _ = writeln!(out, "  {}: {}", key, value);
        }
        if state.selections.len() > item_limit {
            let _ = writeln!(out, "  ... {} more", state.selections.len() - item_limit);
        }
    }

    let counts: Vec<String> = state
        .fields
        .iter()
        .map(|(name, value)| format!("{}={}", name, artifact_count(value)))
        .collect();
    if counts.is_empty() {
        let _ = writeln!(out, "artifacts: none");
    } else {
        let _ = writeln!(out, "artifacts: {}", counts.join(", "));
    }

    if let (Some(plan), Some(cursor)) = (&state.plan, &state.cursor) {
        let _ = writeln!(
            out,
            "active workflow: step {}/{}",
            (cursor.index + 1).min(plan.len()),
            plan.len()
        );
    }

    out.trim_end().to_string()
}

fn artifact_count(value: &Value) -> usize {
    match value {
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        Value::Null => 0,
        Value::String(text) if text.trim().is_empty() => 0,
        _ => 1,
    }
}
