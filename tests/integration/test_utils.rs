//! Shared test utilities for integration tests
//!
//! A scripted invoker standing in for the model provider, plus environment isolation for
//! configuration tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use stagehand::capability::{CapabilityId, CapabilityInvoker};
use stagehand::error::CapabilityError;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex as StdMutex;
use tempfile::TempDir;

/// Replies per capability, in order. Once a capability's script runs out it answers
/// "<capability> output".
#[derive(Default)]
pub struct ScriptedInvoker {
    scripts: Mutex<HashMap<CapabilityId, VecDeque<Result<String, CapabilityError>>>>,
    calls: Mutex<Vec<(CapabilityId, String)>>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, capability: CapabilityId, text: impl Into<String>) -> Self {
        self.scripts
            .lock()
            .entry(capability)
            .or_default()
            .push_back(Ok(text.into()));
        self
    }

    pub fn fail(self, capability: CapabilityId, message: &str) -> Self {
        self.scripts
            .lock()
            .entry(capability)
            .or_default()
            .push_back(Err(CapabilityError::Provider(message.to_string())));
        self
    }

    pub fn calls_to(&self, capability: &CapabilityId) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(called, _)| called == capability)
            .count()
    }

    /// Instructions sent to `capability`, in call order
    pub fn instructions_to(&self, capability: &CapabilityId) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|(called, _)| called == capability)
            .map(|(_, instruction)| instruction.clone())
            .collect()
    }
}

#[async_trait]
impl CapabilityInvoker for ScriptedInvoker {
    async fn invoke(
        &self,
        capability: &CapabilityId,
        instruction: &str,
    ) -> Result<String, CapabilityError> {
        self.calls
            .lock()
            .push((capability.clone(), instruction.to_string()));
        let next = self
            .scripts
            .lock()
            .get_mut(capability)
            .and_then(|queue| queue.pop_front());
        next.unwrap_or_else(|| Ok(format!("{} output", capability)))
    }
}

/// Serializes tests that touch process environment variables
static ENV_MUTEX: StdMutex<()> = StdMutex::new(());

/// Run `f` with `XDG_CONFIG_HOME` pointing into a fresh temp dir and the given extra
/// variables set; every variable is restored afterwards.
pub fn with_isolated_env<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce(&TempDir) -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp = TempDir::new().unwrap();

    let mut names: Vec<&str> = vec!["XDG_CONFIG_HOME", "STAGEHAND_ENV"];
    names.extend(vars.iter().map(|(name, _)| *name));
    let saved: Vec<(String, Option<String>)> = names
        .iter()
        .map(|name| (name.to_string(), std::env::var(name).ok()))
        .collect();

    std::env::set_var("XDG_CONFIG_HOME", temp.path().join("xdg"));
    std::env::remove_var("STAGEHAND_ENV");
    for (name, value) in vars {
        std::env::set_var(name, value);
    }

    let result = f(&temp);

    for (name, value) in saved {
        match value {
            Some(value) => std::env::set_var(&name, value),
            None => std::env::remove_var(&name),
        }
    }
    result
}

/// Supervisor reply proposing a multi-step plan
pub fn plan_reply(steps: &str) -> String {
    format!(
        "Here is the plan:\n```json\n{{\"rationale\": \"multi-part request\", \"steps\": {}}}\n```",
        steps
    )
}
