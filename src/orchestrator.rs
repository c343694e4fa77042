//! Session orchestrator: runs turns, quality gates and batched generation for many
//! sessions, checkpointing after every state-mutating step.
//!
//! Turns of one session are strictly sequential (a per-session async lock); different
//! sessions run concurrently and share only the read-only registry.

use crate::batch::{BatchAccumulator, BatchCursor, BatchSpec};
use crate::capability::{CapabilityId, CapabilityInvoker, CapabilityRegistry, RouteTarget};
use crate::checkpoint::CheckpointStore;
use crate::config::StagehandConfig;
use crate::dispatch::{dispatch_guarded, CapabilityDispatcher, DispatchRequest, InvokerDispatcher};
use crate::error::{OrchestrationError, StorageError};
use crate::quality::{GateOutcome, GatePhase, GateState, QualityGate, ReviewContext};
use crate::router::{IntentRouter, RouteKind};
use crate::session::{SessionFault, SessionState};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// External collaborators of the orchestrator.
#[derive(Clone)]
pub struct Collaborators {
    pub decider: Arc<dyn CapabilityInvoker>,
    pub reviewer: Arc<dyn CapabilityInvoker>,
    pub refiner: Arc<dyn CapabilityInvoker>,
    pub generator: Arc<dyn CapabilityInvoker>,
    pub dispatcher: Arc<dyn CapabilityDispatcher>,
    pub store: Arc<dyn CheckpointStore>,
}

impl Collaborators {
    /// Back every capability with one invoker
    pub fn from_invoker(
        registry: Arc<CapabilityRegistry>,
        invoker: Arc<dyn CapabilityInvoker>,
        store: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            decider: invoker.clone(),
            reviewer: invoker.clone(),
            refiner: invoker.clone(),
            generator: invoker.clone(),
            dispatcher: Arc::new(InvokerDispatcher::new(registry, invoker)),
            store,
        }
    }
}

/// Input of one turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnInput {
    pub utterance: Option<String>,
    /// Target chosen by the caller, bypassing the decision step
    pub target: Option<CapabilityId>,
}

impl TurnInput {
    pub fn message(utterance: impl Into<String>) -> Self {
        Self {
            utterance: Some(utterance.into()),
            target: None,
        }
    }

    pub fn direct(target: CapabilityId) -> Self {
        Self {
            utterance: None,
            target: Some(target),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRecord {
    pub target: CapabilityId,
    pub step_id: Option<String>,
    pub succeeded: bool,
}

/// Summary of a finished turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    pub session_id: String,
    pub route_kinds: Vec<RouteKind>,
    pub dispatched: Vec<DispatchRecord>,
    pub final_target: Option<RouteTarget>,
    pub status: String,
    pub fault: Option<SessionFault>,
    pub revision: u64,
}

/// Result of a batched generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Complete { artifact: String },
    /// The sequence stopped; the cursor is checkpointed at `batch_index` for a retry
    Aborted { batch_index: u32, reason: String },
}

/// Per-session async locks.
#[derive(Default)]
struct SessionLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionLocks {
    fn get(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    /// Drop the entry for `session_id` unless another task is waiting on it.
    ///
    /// `held` is the caller's handle; clones are only made under the map lock, so a count of
    /// two (map and caller) means nobody else holds the mutex.
    fn release(&self, session_id: &str, held: &Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock();
        let idle = locks
            .get(session_id)
            .map(|entry| Arc::ptr_eq(entry, held) && Arc::strong_count(entry) <= 2)
            .unwrap_or(false);
        if idle {
            locks.remove(session_id);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().len()
    }
}

pub struct SessionOrchestrator {
    router: IntentRouter,
    gate: QualityGate,
    accumulator: BatchAccumulator,
    dispatcher: Arc<dyn CapabilityDispatcher>,
    store: Arc<dyn CheckpointStore>,
    max_steps_per_turn: usize,
    history_limit: usize,
    locks: SessionLocks,
}

impl SessionOrchestrator {
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        collaborators: Collaborators,
        config: &StagehandConfig,
    ) -> Self {
        Self {
            router: IntentRouter::new(registry, collaborators.decider, config.router.clone()),
            gate: QualityGate::new(
                collaborators.reviewer,
                collaborators.refiner,
                config.gate.clone(),
            ),
            accumulator: BatchAccumulator::new(collaborators.generator, config.batch.clone()),
            dispatcher: collaborators.dispatcher,
            store: collaborators.store,
            max_steps_per_turn: config.router.max_steps_per_turn.max(1),
            history_limit: config.router.history_limit.max(2),
            locks: SessionLocks::default(),
        }
    }

    pub fn with_review_context(mut self, context: ReviewContext) -> Self {
        self.gate = self.gate.with_context(context);
        self
    }

    async fn load_or_new(&self, session_id: &str) -> Result<SessionState, OrchestrationError> {
        Ok(self
            .store
            .load(session_id)
            .await?
            .unwrap_or_else(|| SessionState::new(session_id)))
    }

    async fn checkpoint(&self, state: &mut SessionState) -> Result<(), OrchestrationError> {
        state.touch();
        self.store.save(&state.session_id, state).await?;
        Ok(())
    }

    /// Run one user turn: route, dispatch, and keep going while an adopted workflow has
    /// steps left.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn run_turn(
        &self,
        session_id: &str,
        input: TurnInput,
    ) -> Result<TurnReport, OrchestrationError> {
        let lock = self.locks.get(session_id);
        let _guard = lock.lock().await;

        let mut state = self.load_or_new(session_id).await?;
        state.fault = None;
        if let Some(utterance) = input.utterance {
            state.push_user(utterance);
        }
        if let Some(target) = input.target {
            state.stamped_target = Some(target);
        }

        let mut route_kinds = Vec::new();
        let mut dispatched = Vec::new();
        let mut final_target = None;

        loop {
            if dispatched.len() >= self.max_steps_per_turn {
                warn!(
                    limit = self.max_steps_per_turn,
                    "Step limit reached, workflow continues next turn"
                );
                break;
            }

            let outcome = self.router.route(&mut state).await;
            route_kinds.push(outcome.kind);
            final_target = Some(outcome.target.clone());
            self.checkpoint(&mut state).await?;

            let RouteTarget::Capability(target) = outcome.target else {
                break;
            };

            let request = match &outcome.step {
                Some(step) => DispatchRequest {
                    target: target.clone(),
                    task: Some(step.task.clone()),
                    output: Some(step.output.clone()),
                    inputs: step.inputs.clone(),
                },
                None => DispatchRequest::new(target.clone()),
            };

            let succeeded = dispatch_guarded(self.dispatcher.as_ref(), &request, &mut state).await;
            if succeeded && outcome.step.is_some() {
                if let Some(cursor) = state.cursor.as_mut() {
                    cursor.step_completed = true;
                }
            }
            dispatched.push(DispatchRecord {
                target,
                step_id: outcome.step.as_ref().map(|step| step.step_id.clone()),
                succeeded,
            });
            self.checkpoint(&mut state).await?;

            if !succeeded || outcome.step.is_none() {
                break;
            }
        }

        if !state.status.is_empty() {
            let status = state.status.clone();
            state.push_assistant(status);
            state.trim_turns(self.history_limit);
            self.checkpoint(&mut state).await?;
        }

        info!(
            dispatched = dispatched.len(),
            revision = state.revision,
            "Turn finished"
        );
        Ok(TurnReport {
            session_id: state.session_id.clone(),
            route_kinds,
            dispatched,
            final_target,
            status: state.status.clone(),
            fault: state.fault.clone(),
            revision: state.revision,
        })
    }

    /// Run the quality gate over a session field.
    ///
    /// An in-flight gate persisted for the same field is resumed at its saved phase and
    /// revision count; otherwise a fresh cycle starts on the field's current text. Accepted artifacts
    /// are written back to the field and the record to `quality_report`.
    #[instrument(skip_all, fields(session_id = %session_id, field = %field))]
    pub async fn review_artifact(
        &self,
        session_id: &str,
        field: &str,
    ) -> Result<GateOutcome, OrchestrationError> {
        let lock = self.locks.get(session_id);
        let _guard = lock.lock().await;

        let mut state = self.load_or_new(session_id).await?;
        let mut gate_state: GateState = match state.quality.take() {
            Some(in_flight)
                if !in_flight.phase.is_terminal() && in_flight.field.as_deref() == Some(field) =>
            {
                info!(revision_count = in_flight.revision_count, "Resuming quality gate");
                in_flight
            }
            previous => {
                if let Some(abandoned) = previous.filter(|gate| !gate.phase.is_terminal()) {
                    warn!(
                        abandoned_field = abandoned.field.as_deref().unwrap_or("unknown"),
                        "Starting a new review over an unfinished one"
                    );
                }
                let mut fresh = self.gate.begin(state.field_text(field).unwrap_or_default());
                fresh.field = Some(field.to_string());
                fresh
            }
        };
        state.quality = Some(gate_state.clone());
        self.checkpoint(&mut state).await?;

        while self.gate.step(&mut gate_state).await {
            state.quality = Some(gate_state.clone());
            self.checkpoint(&mut state).await?;
        }

        let outcome = self.gate.run(&mut gate_state).await;
        if outcome.accepted() {
            state.set_field(field, Value::String(outcome.artifact.clone()));
        }
        if let GatePhase::Blocked { reason } = &outcome.phase {
            state.set_fault(&CapabilityId::Reviewer, reason.clone());
        }
        if let Some(record) = &outcome.record {
            let value = serde_json::to_value(record)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            state.set_field("quality_report", value);
        }
        state.status = outcome.status.clone();
        state.quality = Some(gate_state);
        self.checkpoint(&mut state).await?;
        Ok(outcome)
    }

    /// Generate a long artifact across batches into `output_field`.
    ///
    /// A persisted cursor for the same artifact resumes at its current batch.
    #[instrument(skip_all, fields(session_id = %session_id, kind = %spec.kind))]
    pub async fn generate_in_batches(
        &self,
        session_id: &str,
        spec: &BatchSpec,
        output_field: &str,
    ) -> Result<BatchOutcome, OrchestrationError> {
        let lock = self.locks.get(session_id);
        let _guard = lock.lock().await;

        let mut state = self.load_or_new(session_id).await?;
        let mut cursor = match state.batch.take() {
            Some(saved) if saved.continues(spec) => {
                info!(batch_index = saved.current_index, "Resuming batch sequence");
                saved
            }
            _ => BatchCursor::new(spec),
        };

        while !cursor.is_complete() {
            if let Err(failure) = self.accumulator.run_batch(&mut cursor).await {
                warn!(batch_index = failure.batch_index, reason = %failure.reason, "Batch sequence aborted");
                state.set_fault(&CapabilityId::Drafting, failure.to_string());
                state.status = format!("generation stopped at part {}", failure.batch_index + 1);
                state.batch = Some(cursor);
                self.checkpoint(&mut state).await?;
                return Ok(BatchOutcome::Aborted {
                    batch_index: failure.batch_index,
                    reason: failure.reason,
                });
            }
            state.status = format!(
                "generated part {} of {}",
                cursor.current_index, cursor.total_batches
            );
            state.batch = Some(cursor.clone());
            self.checkpoint(&mut state).await?;
        }

        let artifact = cursor.accumulated.clone();
        state.set_field(output_field, Value::String(artifact.clone()));
        state.batch = None;
        state.fault = None;
        self.checkpoint(&mut state).await?;
        Ok(BatchOutcome::Complete { artifact })
    }

    /// Current checkpoint of a session, if any
    pub async fn session(&self, session_id: &str) -> Result<Option<SessionState>, OrchestrationError> {
        Ok(self.store.load(session_id).await?)
    }

    pub async fn clear_session(&self, session_id: &str) -> Result<(), OrchestrationError> {
        let lock = self.locks.get(session_id);
        let guard = lock.lock().await;
        self.store.delete(session_id).await?;
        drop(guard);
        self.locks.release(session_id, &lock);
        Ok(())
    }

    pub async fn sessions(&self) -> Result<Vec<String>, OrchestrationError> {
        Ok(self.store.list_sessions().await?)
    }
}
