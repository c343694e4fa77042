//! Intent router: the single decision point of a turn.
//!
//! Resumes an adopted workflow, honours a target stamped by the caller, or asks the
//! decision-making capability. Any decision it cannot use fails closed to the terminal
//! target; nothing here raises.

pub mod decision;
pub mod extract;
pub mod instruction;

use crate::capability::{CapabilityId, CapabilityInvoker, CapabilityRegistry, RouteTarget};
use crate::config::RouterConfig;
use crate::session::SessionState;
use crate::workflow::{
    Advance, ContinuationEngine, ExecutionCursor, NextStep, WorkflowValidator,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use decision::{Decision, MultiDecision, SingleDecision};

/// Which path produced the route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Resume,
    Passthrough,
    Fresh,
    FailedClosed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteOutcome {
    pub kind: RouteKind,
    pub target: RouteTarget,
    pub status: String,
    /// Workflow step being dispatched, when the target comes from a plan
    pub step: Option<NextStep>,
}

impl RouteOutcome {
    fn new(kind: RouteKind, target: RouteTarget, status: String) -> Self {
        Self {
            kind,
            target,
            status,
            step: None,
        }
    }

    fn for_step(kind: RouteKind, step: NextStep) -> Self {
        Self {
            kind,
            target: RouteTarget::Capability(step.target.clone()),
            status: step.status.clone(),
            step: Some(step),
        }
    }
}

pub struct IntentRouter {
    registry: Arc<CapabilityRegistry>,
    continuation: ContinuationEngine,
    decider: Arc<dyn CapabilityInvoker>,
    config: RouterConfig,
}

impl IntentRouter {
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        decider: Arc<dyn CapabilityInvoker>,
        config: RouterConfig,
    ) -> Self {
        let continuation = ContinuationEngine::new(registry.clone());
        Self {
            registry,
            continuation,
            decider,
            config,
        }
    }

    pub fn continuation(&self) -> &ContinuationEngine {
        &self.continuation
    }

    /// Decide where this turn goes next and record it on the session.
    pub async fn route(&self, state: &mut SessionState) -> RouteOutcome {
        let outcome = if state.has_active_plan() {
            self.resume(state)
        } else {
            // A plan whose cursor ran off the end is stale.
            if state.plan.is_some() {
                state.clear_plan();
            }
            if let Some(stamped) = state.stamped_target.take() {
                debug!(session_id = %state.session_id, target = %stamped, "Pre-routed passthrough");
                let status = format!("routing to {}", stamped);
                RouteOutcome::new(
                    RouteKind::Passthrough,
                    RouteTarget::Capability(stamped),
                    status,
                )
            } else {
                self.decide(state).await
            }
        };

        state.target = Some(outcome.target.clone());
        state.status = outcome.status.clone();
        info!(
            session_id = %state.session_id,
            kind = ?outcome.kind,
            target = %outcome.target,
            "Routed turn"
        );
        outcome
    }

    /// Re-issue the current step until it completes, then advance.
    fn resume(&self, state: &mut SessionState) -> RouteOutcome {
        let completed = state
            .cursor
            .as_ref()
            .map(|cursor| cursor.step_completed)
            .unwrap_or(false);

        if !completed {
            if let Some(step) = self.continuation.current(state) {
                return RouteOutcome::for_step(RouteKind::Resume, step);
            }
        }

        match self.continuation.advance(state) {
            Advance::Next(step) => RouteOutcome::for_step(RouteKind::Resume, step),
            Advance::PlanComplete { status, .. } => {
                RouteOutcome::new(RouteKind::Resume, RouteTarget::End, status)
            }
        }
    }

    async fn decide(&self, state: &mut SessionState) -> RouteOutcome {
        let instruction = instruction::decision_instruction(
            &self.registry,
            state,
            self.config.summary_item_limit,
        );

        let reply = match self
            .decider
            .invoke(&CapabilityId::Supervisor, &instruction)
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                warn!(session_id = %state.session_id, error = %err, "Decision capability failed");
                state.set_fault(&CapabilityId::Supervisor, err.to_string());
                return self.fail_closed(state, None);
            }
        };

        match Decision::parse(&reply) {
            Decision::Single(single) => self.adopt_single(state, single),
            Decision::Multi(multi) => self.adopt_plan(state, multi),
            Decision::Unparsable(reason) => {
                warn!(session_id = %state.session_id, reason = %reason, "Malformed decision");
                self.fail_closed(state, None)
            }
        }
    }

    fn adopt_single(&self, state: &mut SessionState, single: SingleDecision) -> RouteOutcome {
        let target = RouteTarget::parse(&single.next);
        if let RouteTarget::Capability(id) = &target {
            if !id.is_recognized() || !self.registry.contains(id) {
                warn!(
                    session_id = %state.session_id,
                    target = %id,
                    "Decision names an unknown capability"
                );
                return self.fail_closed(state, None);
            }
        }

        state.clear_plan();
        state.rationale = single.rationale;
        state.action = single.action;
        state.parameters = single.parameters;
        let status = if single.status.trim().is_empty() {
            match &target {
                RouteTarget::Capability(id) => format!("routing to {}", id),
                RouteTarget::End => String::new(),
            }
        } else {
            single.status
        };
        RouteOutcome::new(RouteKind::Fresh, target, status)
    }

    fn adopt_plan(&self, state: &mut SessionState, multi: MultiDecision) -> RouteOutcome {
        let plan = multi.into_plan();
        if plan.is_empty() {
            warn!(session_id = %state.session_id, "Decision proposed an empty workflow");
            return self.fail_closed(state, None);
        }

        if let Err(defect) = WorkflowValidator::new(&self.registry).validate(&plan) {
            warn!(session_id = %state.session_id, reason = %defect, "Rejected workflow");
            return self.fail_closed(state, Some(defect.to_string()));
        }

        info!(session_id = %state.session_id, steps = plan.len(), "Adopted workflow");
        state.rationale = plan.rationale.clone();
        state.action = None;
        state.parameters.clear();
        state.plan = Some(plan);
        state.cursor = Some(ExecutionCursor::start());

        match self.continuation.current(state) {
            Some(step) => RouteOutcome::for_step(RouteKind::Fresh, step),
            None => self.fail_closed(state, None),
        }
    }

    fn fail_closed(&self, state: &mut SessionState, reason: Option<String>) -> RouteOutcome {
        state.clear_plan();
        let status = match reason {
            Some(reason) => format!("{} (invalid workflow: {})", self.config.fallback_status, reason),
            None => self.config.fallback_status.clone(),
        };
        RouteOutcome::new(RouteKind::FailedClosed, RouteTarget::End, status)
    }
}
