use crate::error::OrchestrationError;
use crate::router::extract::extract_payload;
use serde::{Deserialize, Serialize};

/// Refiner reply: what changed and the revised artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinerOutput {
    #[serde(default, alias = "changes")]
    pub change_log: Vec<String>,
    #[serde(alias = "revised", alias = "revised_artifact", alias = "content")]
    pub revised_content: String,
}

impl RefinerOutput {
    pub fn parse(reply: &str) -> Result<Self, OrchestrationError> {
        let payload = extract_payload(reply).ok_or_else(|| {
            OrchestrationError::UnparsableRefinerOutput("no JSON object in reply".to_string())
        })?;
        let output: RefinerOutput = serde_json::from_str(payload)
            .map_err(|e| OrchestrationError::UnparsableRefinerOutput(e.to_string()))?;
        if output.revised_content.trim().is_empty() {
            return Err(OrchestrationError::UnparsableRefinerOutput(
                "revised content is empty".to_string(),
            ));
        }
        Ok(output)
    }
}
