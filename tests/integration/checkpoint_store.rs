//! Durable checkpointing through the sled backend

use super::test_utils::{plan_reply, ScriptedInvoker};
use stagehand::capability::{CapabilityId, CapabilityRegistry};
use stagehand::checkpoint::{CheckpointStore, SledCheckpointStore};
use stagehand::config::StagehandConfig;
use stagehand::orchestrator::{Collaborators, SessionOrchestrator, TurnInput};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn interrupted_workflow_resumes_from_sled_checkpoint() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SledCheckpointStore::open(&dir.path().join("checkpoints")).unwrap());
    let registry = Arc::new(CapabilityRegistry::with_defaults());

    let steps = r#"[
        {"id": "outline", "target": "outline", "task": "outline the book"},
        {"id": "draft", "target": "drafting", "task": "draft chapter one",
         "depends_on": ["outline"], "inputs": {"outline": "outline"}}
    ]"#;
    let first_invoker = Arc::new(
        ScriptedInvoker::new()
            .reply(CapabilityId::Supervisor, plan_reply(steps))
            .fail(CapabilityId::Drafting, "process killed"),
    );
    let first = SessionOrchestrator::new(
        registry.clone(),
        Collaborators::from_invoker(registry.clone(), first_invoker, store.clone()),
        &StagehandConfig::default(),
    );
    let report = first
        .run_turn("book", TurnInput::message("outline and draft"))
        .await
        .unwrap();
    assert!(report.fault.is_some());
    let revision_after_failure = report.revision;
    drop(first);

    // A fresh orchestrator over a second handle on the same database.
    let reopened = Arc::new(SledCheckpointStore::new(store.db().clone()).unwrap());
    let saved = reopened.load("book").await.unwrap().unwrap();
    assert_eq!(saved.revision, revision_after_failure);
    assert_eq!(saved.cursor.as_ref().unwrap().index, 1);

    let second_invoker = Arc::new(ScriptedInvoker::new());
    let second = SessionOrchestrator::new(
        registry.clone(),
        Collaborators::from_invoker(registry, second_invoker.clone(), reopened.clone()),
        &StagehandConfig::default(),
    );
    let report = second
        .run_turn("book", TurnInput::message("continue"))
        .await
        .unwrap();
    assert!(report.fault.is_none());
    assert_eq!(second_invoker.calls_to(&CapabilityId::Supervisor), 0);
    assert_eq!(second_invoker.calls_to(&CapabilityId::Outline), 0);
    assert_eq!(second_invoker.calls_to(&CapabilityId::Drafting), 1);

    let draft_instruction = second_invoker
        .instructions_to(&CapabilityId::Drafting)
        .pop()
        .unwrap();
    assert!(draft_instruction.contains("outline output"));

    let saved = reopened.load("book").await.unwrap().unwrap();
    assert_eq!(saved.field_text("draft").unwrap(), "drafting output");
    assert!(saved.revision > revision_after_failure);
    assert_eq!(reopened.list_sessions().await.unwrap(), vec!["book"]);
}
