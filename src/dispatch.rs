//! Capability dispatch boundary.
//!
//! Runs the routed capability and folds its declared outputs back into session state.
//! Invocation failures become a session fault here; they never propagate further.

use crate::capability::{CapabilityId, CapabilityInvoker, CapabilityRegistry};
use crate::error::CapabilityError;
use crate::session::SessionState;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, warn};

/// What to run and with which inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    pub target: CapabilityId,
    /// Workflow step task, when dispatched from a plan
    pub task: Option<String>,
    /// Field to write the reply to; the capability's primary output when unset
    pub output: Option<String>,
    pub inputs: BTreeMap<String, Value>,
}

impl DispatchRequest {
    pub fn new(target: CapabilityId) -> Self {
        Self {
            target,
            task: None,
            output: None,
            inputs: BTreeMap::new(),
        }
    }
}

/// Fields written by a capability, plus an optional status for the user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub fields: BTreeMap<String, Value>,
    pub status: Option<String>,
}

impl StateUpdate {
    pub fn field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn apply(self, state: &mut SessionState) {
        for (name, value) in self.fields {
            state.set_field(name, value);
        }
        if let Some(status) = self.status {
            state.status = status;
        }
    }
}

#[async_trait]
pub trait CapabilityDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        request: &DispatchRequest,
        state: &SessionState,
    ) -> Result<StateUpdate, CapabilityError>;
}

/// Dispatch and apply the update; a failure is recorded as a session fault instead.
///
/// Returns whether the capability succeeded.
pub async fn dispatch_guarded(
    dispatcher: &dyn CapabilityDispatcher,
    request: &DispatchRequest,
    state: &mut SessionState,
) -> bool {
    match dispatcher.dispatch(request, state).await {
        Ok(update) => {
            debug!(
                session_id = %state.session_id,
                target = %request.target,
                fields = update.fields.len(),
                "Capability finished"
            );
            update.apply(state);
            state.fault = None;
            true
        }
        Err(err) => {
            warn!(
                session_id = %state.session_id,
                target = %request.target,
                error = %err,
                "Capability failed"
            );
            state.set_fault(&request.target, err.to_string());
            false
        }
    }
}

/// Dispatcher that sends any capability to a [`CapabilityInvoker`] and stores the reply in
/// the requested output field, or the capability's first declared output.
pub struct InvokerDispatcher {
    registry: Arc<CapabilityRegistry>,
    invoker: Arc<dyn CapabilityInvoker>,
}

impl InvokerDispatcher {
    pub fn new(registry: Arc<CapabilityRegistry>, invoker: Arc<dyn CapabilityInvoker>) -> Self {
        Self { registry, invoker }
    }

    fn render(request: &DispatchRequest, state: &SessionState) -> String {
        let mut out = String::new();
        if let Some(task) = &request.task {
            let _ = writeln!(out, "Task: {}", task);
        }
        if let Some(action) = &state.action {
            let _ = writeln!(out, "Action: {}", action);
        }
        for (name, value) in &state.parameters {
            let _ = writeln!(out, "Parameter {}: {}", name, value);
        }
        for (name, value) in &request.inputs {
            let text = match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            let _ = writeln!(out, "\n## {}\n{}", name, text);
        }
        if let Some(utterance) = state.latest_utterance() {
            let _ = writeln!(out, "\n## User request\n{}", utterance);
        }
        out
    }
}

#[async_trait]
impl CapabilityDispatcher for InvokerDispatcher {
    async fn dispatch(
        &self,
        request: &DispatchRequest,
        state: &SessionState,
    ) -> Result<StateUpdate, CapabilityError> {
        let descriptor = self.registry.get(&request.target).ok_or_else(|| {
            CapabilityError::Rejected(format!("capability '{}' is not registered", request.target))
        })?;
        let output = match &request.output {
            Some(field) => field.clone(),
            None => descriptor
                .primary_output()
                .unwrap_or(request.target.as_str())
                .to_string(),
        };

        let reply = self
            .invoker
            .invoke(&request.target, &Self::render(request, state))
            .await?;

        Ok(StateUpdate {
            fields: BTreeMap::from([(output, Value::String(reply))]),
            status: Some(format!("{} finished", descriptor.label)),
        })
    }
}
