use crate::capability::CapabilityRegistry;
use crate::session::{summarize, SessionState};

const RESPONSE_CONTRACT: &str = r#"Respond with exactly one JSON object.
For a single next capability:
{"rationale": "...", "next": "<capability id or end>", "action": null, "parameters": {}, "status": "..."}
For a request that needs several capabilities in order:
{"rationale": "...", "steps": [{"id": "s1", "target": "<capability id>", "task": "...", "depends_on": [], "inputs": {}, "output": null}], "status": "...", "estimated_steps": 1}
Use "end" when nothing should run."#;

/// Build the instruction for the decision-making capability: catalog, session summary and
/// the latest user utterance.
pub fn decision_instruction(
    registry: &CapabilityRegistry,
    state: &SessionState,
    summary_item_limit: usize,
) -> String {
    let utterance = state.latest_utterance().unwrap_or("");
    format!(
        "# Available capabilities\n{}\n\n# Session\n{}\n\n# Latest user message\n{}\n\n# Response format\n{}",
        registry.describe_for_prompt(),
        summarize(state, summary_item_limit),
        utterance,
        RESPONSE_CONTRACT
    )
}
