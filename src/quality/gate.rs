//! Bounded review/refine loop as a persistable state machine.
//!
//! Termination: every review either finishes the cycle or is followed by one refinement,
//! and the refinement counter is capped, so a cycle makes at most `max_revisions + 1`
//! reviewer calls.

use crate::capability::{CapabilityId, CapabilityInvoker};
use crate::config::GateConfig;
use crate::error::OrchestrationError;
use crate::quality::record::QualityRecord;
use crate::quality::refinement::RefinerOutput;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum GatePhase {
    Reviewing,
    NeedsRefinement,
    Refining,
    /// `forced` marks acceptance after the revision cap rather than on score
    Accepted { forced: bool },
    Blocked { reason: String },
}

impl GatePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GatePhase::Accepted { .. } | GatePhase::Blocked { .. })
    }
}

/// Gate progress, stored on the session between transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateState {
    pub phase: GatePhase,
    /// Session field the artifact was read from and is written back to
    #[serde(default)]
    pub field: Option<String>,
    /// Current candidate artifact
    pub artifact: String,
    pub revision_count: u32,
    #[serde(default)]
    pub record: Option<QualityRecord>,
    #[serde(default)]
    pub reviewer_calls: u32,
    #[serde(default)]
    pub refiner_calls: u32,
    #[serde(default)]
    pub change_log: Vec<String>,
}

/// Final result of a gate cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutcome {
    pub phase: GatePhase,
    pub artifact: String,
    pub record: Option<QualityRecord>,
    pub revision_count: u32,
    pub status: String,
}

impl GateOutcome {
    pub fn accepted(&self) -> bool {
        matches!(self.phase, GatePhase::Accepted { .. })
    }

    pub fn forced(&self) -> bool {
        matches!(self.phase, GatePhase::Accepted { forced: true })
    }

    /// Outcome of a terminal state; `None` while the cycle is still running
    pub fn from_state(state: &GateState) -> Option<Self> {
        let score = state.record.as_ref().map(|record| record.score).unwrap_or(0);
        let status = match &state.phase {
            GatePhase::Accepted { forced: false } => {
                format!("accepted with score {} after {} revisions", score, state.revision_count)
            }
            GatePhase::Accepted { forced: true } => format!(
                "accepted after reaching the revision limit ({} revisions, last score {})",
                state.revision_count, score
            ),
            GatePhase::Blocked { reason } => format!("blocked: {}", reason),
            _ => return None,
        };
        Some(Self {
            phase: state.phase.clone(),
            artifact: state.artifact.clone(),
            record: state.record.clone(),
            revision_count: state.revision_count,
            status,
        })
    }
}

/// Reviewer and refiner guidance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewContext {
    /// Relative weight per quality category
    #[serde(default)]
    pub weights: BTreeMap<String, f32>,
    #[serde(default)]
    pub checklists: BTreeMap<String, Vec<String>>,
    /// Domain parameters such as genre or audience
    #[serde(default)]
    pub domain: BTreeMap<String, String>,
    #[serde(default)]
    pub style_hints: Vec<String>,
}

pub struct QualityGate {
    reviewer: Arc<dyn CapabilityInvoker>,
    refiner: Arc<dyn CapabilityInvoker>,
    config: GateConfig,
    context: ReviewContext,
}

impl QualityGate {
    pub fn new(
        reviewer: Arc<dyn CapabilityInvoker>,
        refiner: Arc<dyn CapabilityInvoker>,
        config: GateConfig,
    ) -> Self {
        Self {
            reviewer,
            refiner,
            config,
            context: ReviewContext::default(),
        }
    }

    pub fn with_context(mut self, context: ReviewContext) -> Self {
        self.context = context;
        self
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Start a fresh cycle for a brand-new artifact; the revision counter starts at zero.
    pub fn begin(&self, artifact: impl Into<String>) -> GateState {
        GateState {
            phase: GatePhase::Reviewing,
            field: None,
            artifact: artifact.into(),
            revision_count: 0,
            record: None,
            reviewer_calls: 0,
            refiner_calls: 0,
            change_log: Vec::new(),
        }
    }

    /// Perform exactly one transition. Returns `false` once the state is terminal.
    pub async fn step(&self, state: &mut GateState) -> bool {
        match state.phase {
            GatePhase::Reviewing => {
                self.review(state).await;
                true
            }
            GatePhase::NeedsRefinement => {
                state.phase = GatePhase::Refining;
                true
            }
            GatePhase::Refining => {
                self.refine(state).await;
                true
            }
            GatePhase::Accepted { .. } | GatePhase::Blocked { .. } => false,
        }
    }

    /// Drive the cycle to a terminal phase.
    pub async fn run(&self, state: &mut GateState) -> GateOutcome {
        while self.step(state).await {}
        match GateOutcome::from_state(state) {
            Some(outcome) => outcome,
            // step() only stops on terminal phases
            None => GateOutcome {
                phase: state.phase.clone(),
                artifact: state.artifact.clone(),
                record: state.record.clone(),
                revision_count: state.revision_count,
                status: String::new(),
            },
        }
    }

    async fn review(&self, state: &mut GateState) {
        if state.artifact.trim().is_empty() {
            let reason = OrchestrationError::EmptyUpstreamArtifact.to_string();
            warn!("Quality gate blocked: {}", reason);
            state.record = Some(QualityRecord::system_failure(&reason, state.revision_count));
            state.phase = GatePhase::Blocked { reason };
            return;
        }

        let instruction = self.review_instruction(&state.artifact);
        state.reviewer_calls += 1;
        let reply = match self
            .reviewer
            .invoke(&CapabilityId::Reviewer, &instruction)
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                self.block(state, format!("reviewer failed: {}", err));
                return;
            }
        };

        let mut record = match QualityRecord::parse(&reply) {
            Ok(record) => record,
            Err(err) => {
                self.block(state, err.to_string());
                return;
            }
        };
        record.revision_count = state.revision_count;

        let phase = if record.is_system_failure() {
            GatePhase::Blocked {
                reason: format!("reviewer reported a system error: {}", record.summary),
            }
        } else if record.score >= self.config.accept_threshold {
            GatePhase::Accepted { forced: false }
        } else if state.revision_count >= self.config.max_revisions {
            GatePhase::Accepted { forced: true }
        } else {
            GatePhase::NeedsRefinement
        };

        debug!(
            score = record.score,
            revision_count = state.revision_count,
            next = ?phase,
            "Reviewed artifact"
        );
        if let GatePhase::Accepted { forced } = phase {
            info!(score = record.score, forced, "Artifact accepted");
        }
        state.record = Some(record);
        state.phase = phase;
    }

    async fn refine(&self, state: &mut GateState) {
        let Some(record) = state.record.as_ref() else {
            self.block(state, "refinement requested without a quality record".to_string());
            return;
        };

        let instruction = self.refine_instruction(&state.artifact, record);
        state.refiner_calls += 1;
        let reply = match self
            .refiner
            .invoke(&CapabilityId::Refiner, &instruction)
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                self.block(state, format!("refiner failed: {}", err));
                return;
            }
        };

        match RefinerOutput::parse(&reply) {
            Ok(output) => {
                state.artifact = output.revised_content;
                state.change_log.extend(output.change_log);
                state.revision_count += 1;
                state.phase = GatePhase::Reviewing;
                debug!(revision_count = state.revision_count, "Refined artifact");
            }
            Err(err) => self.block(state, err.to_string()),
        }
    }

    fn block(&self, state: &mut GateState, reason: String) {
        warn!("Quality gate blocked: {}", reason);
        state.phase = GatePhase::Blocked { reason };
    }

    fn review_instruction(&self, artifact: &str) -> String {
        let mut out = String::from(
            "Review the artifact below. Respond with one JSON object: \
             {\"overall_score\": 0-100, \"category_scores\": {}, \"issues\": \
             [{\"category\": \"\", \"severity\": \"low|medium|high|critical\", \"description\": \"\"}], \
             \"summary\": \"\"}\n",
        );
        if !self.context.weights.is_empty() {
            out.push_str("\n## Category weights\n");
            for (category, weight) in &self.context.weights {
                let _ = writeln!(out, "- {}: {}", category, weight);
            }
        }
        if !self.context.checklists.is_empty() {
            out.push_str("\n## Checklists\n");
            for (category, items) in &self.context.checklists {
                let _ = writeln!(out, "### {}", category);
                for item in items {
                    let _ = writeln!(out, "- {}", item);
                }
            }
        }
        if !self.context.domain.is_empty() {
            out.push_str("\n## Domain\n");
            for (key, value) in &self.context.domain {
                let _ = writeln!(out, "- {}: {}", key, value);
            }
        }
        let _ = write!(out, "\n## Artifact\n{}", artifact);
        out
    }

    fn refine_instruction(&self, artifact: &str, record: &QualityRecord) -> String {
        let mut out = String::from(
            "Revise the artifact to address the review. Respond with one JSON object: \
             {\"change_log\": [\"...\"], \"revised_content\": \"...\"}\n",
        );
        let _ = writeln!(out, "\n## Review (score {})\n{}", record.score, record.summary);
        for issue in &record.issues {
            let _ = writeln!(
                out,
                "- [{:?}] {}: {}",
                issue.severity, issue.category, issue.description
            );
        }
        if !self.context.style_hints.is_empty() {
            out.push_str("\n## Style and voice\n");
            for hint in &self.context.style_hints {
                let _ = writeln!(out, "- {}", hint);
            }
        }
        let _ = write!(out, "\n## Artifact\n{}", artifact);
        out
    }
}
