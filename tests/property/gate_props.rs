//! Property tests for quality gate termination

use async_trait::async_trait;
use parking_lot::Mutex;
use proptest::prelude::*;
use stagehand::capability::{CapabilityId, CapabilityInvoker};
use stagehand::config::GateConfig;
use stagehand::error::CapabilityError;
use stagehand::quality::{GatePhase, QualityGate};
use std::sync::Arc;

/// Reviewer answering with the scripted scores in order, then the last one forever
struct ScoreScript {
    scores: Vec<u8>,
    calls: Mutex<usize>,
}

#[async_trait]
impl CapabilityInvoker for ScoreScript {
    async fn invoke(
        &self,
        _capability: &CapabilityId,
        _instruction: &str,
    ) -> Result<String, CapabilityError> {
        let mut calls = self.calls.lock();
        let score = self
            .scores
            .get(*calls)
            .or(self.scores.last())
            .copied()
            .unwrap_or(50);
        *calls += 1;
        Ok(format!(r#"{{"score": {}, "summary": "round {}"}}"#, score, calls))
    }
}

struct CountingRefiner {
    calls: Mutex<usize>,
}

#[async_trait]
impl CapabilityInvoker for CountingRefiner {
    async fn invoke(
        &self,
        _capability: &CapabilityId,
        _instruction: &str,
    ) -> Result<String, CapabilityError> {
        let mut calls = self.calls.lock();
        *calls += 1;
        Ok(format!(r#"{{"revised_content": "revision {}"}}"#, calls))
    }
}

proptest! {
    #[test]
    fn gate_terminates_within_revision_budget(
        scores in prop::collection::vec(1u8..=100, 1..8),
        threshold in 1u8..=100,
        max_revisions in 0u32..5,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let reviewer = Arc::new(ScoreScript { scores: scores.clone(), calls: Mutex::new(0) });
        let refiner = Arc::new(CountingRefiner { calls: Mutex::new(0) });
        let gate = QualityGate::new(
            reviewer.clone(),
            refiner.clone(),
            GateConfig { accept_threshold: threshold, max_revisions },
        );

        let mut state = gate.begin("first draft");
        let outcome = runtime.block_on(gate.run(&mut state));

        let reviews = *reviewer.calls.lock();
        let refinements = *refiner.calls.lock();
        prop_assert!(reviews <= max_revisions as usize + 1);
        prop_assert_eq!(refinements + 1, reviews);
        prop_assert_eq!(outcome.revision_count as usize, refinements);

        let final_score = outcome.record.as_ref().map(|r| r.score).unwrap_or(0);
        match outcome.phase {
            GatePhase::Accepted { forced: false } => prop_assert!(final_score >= threshold),
            GatePhase::Accepted { forced: true } => {
                prop_assert!(final_score < threshold);
                prop_assert_eq!(outcome.revision_count, max_revisions);
            }
            other => prop_assert!(false, "unexpected phase {:?}", other),
        }
    }
}
