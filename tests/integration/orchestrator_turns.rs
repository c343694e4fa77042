//! Multi-turn behaviour of the session orchestrator

use super::test_utils::{plan_reply, ScriptedInvoker};
use stagehand::capability::{CapabilityId, CapabilityRegistry, RouteTarget};
use stagehand::checkpoint::{CheckpointStore, MemoryCheckpointStore};
use stagehand::config::StagehandConfig;
use stagehand::batch::BatchSpec;
use stagehand::orchestrator::{BatchOutcome, Collaborators, SessionOrchestrator, TurnInput};
use stagehand::quality::{GatePhase, GateState, QualityRecord};
use stagehand::router::RouteKind;
use stagehand::session::{SessionState, TurnRole};
use std::sync::Arc;

fn orchestrator(
    invoker: Arc<ScriptedInvoker>,
    store: Arc<MemoryCheckpointStore>,
) -> SessionOrchestrator {
    let registry = Arc::new(CapabilityRegistry::with_defaults());
    SessionOrchestrator::new(
        registry.clone(),
        Collaborators::from_invoker(registry, invoker, store),
        &StagehandConfig::default(),
    )
}

const THREE_STEPS: &str = r#"[
    {"id": "ideas", "target": "ideation", "task": "pitch three premises"},
    {"id": "world", "target": "world_building", "task": "build the setting",
     "depends_on": ["ideas"], "inputs": {"premise": "ideas"}},
    {"id": "cast", "target": "character_design", "task": "design the cast",
     "depends_on": ["world"], "inputs": {"setting": "world"}}
]"#;

#[tokio::test]
async fn failed_step_resumes_next_turn_without_new_decision() {
    let invoker = Arc::new(
        ScriptedInvoker::new()
            .reply(CapabilityId::Supervisor, plan_reply(THREE_STEPS))
            .reply(CapabilityId::Ideation, "a drowned city")
            .fail(CapabilityId::WorldBuilding, "upstream timeout")
            .reply(CapabilityId::WorldBuilding, "canals and bell towers"),
    );
    let store = Arc::new(MemoryCheckpointStore::new());
    let orchestrator = orchestrator(invoker.clone(), store.clone());

    let first = orchestrator
        .run_turn("s", TurnInput::message("give me a premise, a world and a cast"))
        .await
        .unwrap();
    assert_eq!(first.dispatched.len(), 2);
    assert!(first.dispatched[0].succeeded);
    assert!(!first.dispatched[1].succeeded);
    let fault = first.fault.expect("fault recorded");
    assert_eq!(fault.capability, "world_building");
    assert!(fault.message.contains("upstream timeout"));

    let saved = store.load("s").await.unwrap().unwrap();
    assert_eq!(saved.cursor.as_ref().unwrap().index, 1);
    assert!(!saved.cursor.as_ref().unwrap().step_completed);
    assert_eq!(saved.field_text("ideas").unwrap(), "a drowned city");

    let second = orchestrator
        .run_turn("s", TurnInput::message("try again"))
        .await
        .unwrap();
    assert_eq!(second.route_kinds[0], RouteKind::Resume);
    assert_eq!(second.dispatched.len(), 2);
    assert!(second.dispatched.iter().all(|d| d.succeeded));
    assert_eq!(second.final_target, Some(RouteTarget::End));
    assert!(second.fault.is_none());
    assert_eq!(invoker.calls_to(&CapabilityId::Supervisor), 1);

    // The cast step sees the world built in the retried step.
    let cast_instruction = invoker
        .instructions_to(&CapabilityId::CharacterDesign)
        .pop()
        .unwrap();
    assert!(cast_instruction.contains("canals and bell towers"));

    let saved = store.load("s").await.unwrap().unwrap();
    assert!(saved.plan.is_none());
    assert_eq!(saved.field_text("characters").unwrap(), "character_design output");
}

#[tokio::test]
async fn declared_outputs_feed_downstream_steps() {
    let steps = r#"[
        {"id": "s1", "target": "ideation", "task": "pitch a premise", "output": "premise"},
        {"id": "s2", "target": "outline", "task": "outline it",
         "depends_on": ["s1"], "inputs": {"concept": "premise"}},
        {"id": "s3", "target": "drafting", "task": "draft chapter one",
         "depends_on": ["s2"], "inputs": {"plan": "s2"}, "output": "chapter_one"}
    ]"#;
    let invoker = Arc::new(
        ScriptedInvoker::new()
            .reply(CapabilityId::Supervisor, plan_reply(steps))
            .reply(CapabilityId::Ideation, "a lighthouse keeper hears the sea answer")
            .reply(CapabilityId::Outline, "1. the voice 2. the storm"),
    );
    let store = Arc::new(MemoryCheckpointStore::new());
    let orchestrator = orchestrator(invoker.clone(), store.clone());

    let report = orchestrator
        .run_turn("o", TurnInput::message("premise, outline, first chapter"))
        .await
        .unwrap();
    assert_eq!(report.dispatched.len(), 3);
    assert_eq!(report.final_target, Some(RouteTarget::End));

    let saved = store.load("o").await.unwrap().unwrap();
    assert_eq!(
        saved.field_text("premise").unwrap(),
        "a lighthouse keeper hears the sea answer"
    );
    assert!(saved.field("ideas").is_none());
    assert_eq!(saved.field_text("chapter_one").unwrap(), "drafting output");
    assert!(saved.field("draft").is_none());

    let outline_instruction = invoker.instructions_to(&CapabilityId::Outline).pop().unwrap();
    assert!(outline_instruction.contains("## concept\na lighthouse keeper hears the sea answer"));
    let draft_instruction = invoker.instructions_to(&CapabilityId::Drafting).pop().unwrap();
    assert!(draft_instruction.contains("## plan\n1. the voice 2. the storm"));
    assert!(!draft_instruction.contains("null"));
}

#[tokio::test]
async fn step_results_are_recorded_under_step_ids() {
    let steps = r#"[
        {"id": "pitch", "target": "ideation", "task": "pitch", "output": "premise"},
        {"id": "shape", "target": "outline", "task": "outline", "inputs": {"concept": "pitch"}},
        {"id": "write", "target": "drafting", "task": "draft"}
    ]"#;
    let invoker = Arc::new(
        ScriptedInvoker::new()
            .reply(CapabilityId::Supervisor, plan_reply(steps))
            .reply(CapabilityId::Ideation, "twin moons")
            .fail(CapabilityId::Drafting, "overloaded"),
    );
    let store = Arc::new(MemoryCheckpointStore::new());
    let orchestrator = orchestrator(invoker.clone(), store.clone());

    orchestrator
        .run_turn("r", TurnInput::message("go"))
        .await
        .unwrap();

    let saved = store.load("r").await.unwrap().unwrap();
    let cursor = saved.cursor.as_ref().unwrap();
    assert_eq!(cursor.index, 2);
    assert_eq!(cursor.results["pitch"], serde_json::json!("twin moons"));
    assert_eq!(cursor.results["shape"], serde_json::json!("outline output"));
    let outline_instruction = invoker.instructions_to(&CapabilityId::Outline).pop().unwrap();
    assert!(outline_instruction.contains("## concept\ntwin moons"));
}

#[tokio::test]
async fn cyclic_plan_fails_closed_without_dispatch() {
    let cyclic = r#"[
        {"id": "a", "target": "outline", "task": "t", "depends_on": ["b"]},
        {"id": "b", "target": "drafting", "task": "t", "depends_on": ["a"]}
    ]"#;
    let invoker = Arc::new(ScriptedInvoker::new().reply(CapabilityId::Supervisor, plan_reply(cyclic)));
    let store = Arc::new(MemoryCheckpointStore::new());
    let orchestrator = orchestrator(invoker.clone(), store.clone());

    let report = orchestrator
        .run_turn("s", TurnInput::message("outline then draft"))
        .await
        .unwrap();
    assert_eq!(report.route_kinds, vec![RouteKind::FailedClosed]);
    assert!(report.dispatched.is_empty());
    assert_eq!(report.final_target, Some(RouteTarget::End));
    assert!(report.status.contains("invalid workflow"));
    assert!(report.status.contains("cycle"));

    let saved = store.load("s").await.unwrap().unwrap();
    assert!(saved.plan.is_none());
    assert_eq!(invoker.calls_to(&CapabilityId::Outline), 0);
    let last = saved.turns.last().unwrap();
    assert_eq!(last.role, TurnRole::Assistant);
    assert_eq!(last.content, report.status);
}

#[tokio::test]
async fn unknown_single_target_fails_closed() {
    let invoker = Arc::new(
        ScriptedInvoker::new().reply(CapabilityId::Supervisor, r#"{"next": "juggler"}"#),
    );
    let orchestrator = orchestrator(invoker.clone(), Arc::new(MemoryCheckpointStore::new()));
    let report = orchestrator
        .run_turn("s", TurnInput::message("juggle"))
        .await
        .unwrap();
    assert_eq!(report.route_kinds, vec![RouteKind::FailedClosed]);
    assert!(report.dispatched.is_empty());
}

#[tokio::test]
async fn single_decision_dispatches_once() {
    let invoker = Arc::new(ScriptedInvoker::new().reply(
        CapabilityId::Supervisor,
        r#"{"next": "summarizer", "status": "Summarizing"}"#,
    ));
    let store = Arc::new(MemoryCheckpointStore::new());
    let orchestrator = orchestrator(invoker.clone(), store.clone());

    let report = orchestrator
        .run_turn("s", TurnInput::message("sum it up"))
        .await
        .unwrap();
    assert_eq!(report.route_kinds, vec![RouteKind::Fresh]);
    assert_eq!(report.dispatched.len(), 1);
    assert_eq!(report.dispatched[0].target, CapabilityId::Summarizer);
    assert_eq!(invoker.calls_to(&CapabilityId::Supervisor), 1);

    let saved = store.load("s").await.unwrap().unwrap();
    assert_eq!(saved.field_text("summary").unwrap(), "summarizer output");
}

#[tokio::test]
async fn sessions_run_independently() {
    let invoker = Arc::new(ScriptedInvoker::new());
    let store = Arc::new(MemoryCheckpointStore::new());
    let orchestrator = Arc::new(orchestrator(invoker.clone(), store.clone()));

    let a = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            orchestrator
                .run_turn("alpha", TurnInput::direct(CapabilityId::Ideation))
                .await
        })
    };
    let b = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            orchestrator
                .run_turn("beta", TurnInput::direct(CapabilityId::Outline))
                .await
        })
    };
    let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());
    assert_eq!(a.dispatched[0].target, CapabilityId::Ideation);
    assert_eq!(b.dispatched[0].target, CapabilityId::Outline);

    let alpha = store.load("alpha").await.unwrap().unwrap();
    let beta = store.load("beta").await.unwrap().unwrap();
    assert!(alpha.field("outline").is_none());
    assert!(beta.field("ideas").is_none());
    assert_eq!(
        orchestrator.sessions().await.unwrap(),
        vec!["alpha".to_string(), "beta".to_string()]
    );
}

#[tokio::test]
async fn persisted_gate_resumes_at_saved_revision() {
    // A gate that crashed after its second refinement was reviewed.
    let store = Arc::new(MemoryCheckpointStore::new());
    let mut state = SessionState::new("g");
    state.set_field("draft", serde_json::json!("v0"));
    state.quality = Some(GateState {
        phase: GatePhase::NeedsRefinement,
        field: Some("draft".to_string()),
        artifact: "v2".to_string(),
        revision_count: 2,
        record: Some(
            QualityRecord::parse(r#"{"score": 55, "summary": "weak"}"#)
                .unwrap(),
        ),
        reviewer_calls: 3,
        refiner_calls: 2,
        change_log: vec![],
    });
    store.save("g", &state).await.unwrap();

    let invoker = Arc::new(
        ScriptedInvoker::new()
            .reply(
                CapabilityId::Refiner,
                r#"{"change_log": ["sharper ending"], "revised_content": "v3"}"#,
            )
            .reply(CapabilityId::Reviewer, r#"{"score": 61, "summary": "still weak"}"#),
    );
    let orchestrator = orchestrator(invoker.clone(), store.clone());
    let outcome = orchestrator.review_artifact("g", "draft").await.unwrap();

    assert_eq!(invoker.calls_to(&CapabilityId::Refiner), 1);
    assert_eq!(invoker.calls_to(&CapabilityId::Reviewer), 1);
    assert_eq!(outcome.phase, GatePhase::Accepted { forced: true });
    assert_eq!(outcome.revision_count, 3);

    let saved = store.load("g").await.unwrap().unwrap();
    assert_eq!(saved.field_text("draft").unwrap(), "v3");
    assert_eq!(saved.field("quality_report").unwrap()["score"], 61);
}

#[tokio::test]
async fn unfinished_gate_on_another_field_is_not_resumed() {
    let store = Arc::new(MemoryCheckpointStore::new());
    let mut state = SessionState::new("g");
    state.set_field("draft", serde_json::json!("CHAPTER DRAFT"));
    state.set_field("outline", serde_json::json!("OUTLINE TEXT"));
    state.quality = Some(GateState {
        phase: GatePhase::Reviewing,
        field: Some("draft".to_string()),
        artifact: "CHAPTER DRAFT".to_string(),
        revision_count: 1,
        record: None,
        reviewer_calls: 0,
        refiner_calls: 0,
        change_log: vec![],
    });
    store.save("g", &state).await.unwrap();

    let invoker = Arc::new(
        ScriptedInvoker::new()
            .reply(CapabilityId::Reviewer, r#"{"score": 92, "summary": "tight"}"#),
    );
    let orchestrator = orchestrator(invoker.clone(), store.clone());
    let outcome = orchestrator.review_artifact("g", "outline").await.unwrap();

    assert_eq!(outcome.phase, GatePhase::Accepted { forced: false });
    assert_eq!(outcome.revision_count, 0);
    assert!(invoker
        .instructions_to(&CapabilityId::Reviewer)
        .pop()
        .unwrap()
        .contains("OUTLINE TEXT"));

    let saved = store.load("g").await.unwrap().unwrap();
    assert_eq!(saved.field_text("outline").unwrap(), "OUTLINE TEXT");
    assert_eq!(saved.field_text("draft").unwrap(), "CHAPTER DRAFT");
    assert_eq!(saved.quality.unwrap().field.as_deref(), Some("outline"));
}

#[tokio::test]
async fn empty_artifact_blocks_review() {
    let invoker = Arc::new(ScriptedInvoker::new());
    let store = Arc::new(MemoryCheckpointStore::new());
    let orchestrator = orchestrator(invoker.clone(), store.clone());

    let outcome = orchestrator.review_artifact("e", "draft").await.unwrap();
    assert!(matches!(outcome.phase, GatePhase::Blocked { .. }));
    assert_eq!(invoker.calls_to(&CapabilityId::Reviewer), 0);

    let saved = store.load("e").await.unwrap().unwrap();
    assert_eq!(saved.fault.unwrap().capability, "reviewer");
}

#[tokio::test]
async fn changed_unit_count_restarts_the_batch_sequence() {
    let invoker = Arc::new(
        ScriptedInvoker::new()
            .reply(CapabilityId::Drafting, "skeleton of six")
            .fail(CapabilityId::Drafting, "overloaded")
            .reply(CapabilityId::Drafting, "skeleton of nine")
            .reply(CapabilityId::Drafting, "scenes 1-4")
            .reply(CapabilityId::Drafting, "scenes 5-9"),
    );
    let store = Arc::new(MemoryCheckpointStore::new());
    let orchestrator = orchestrator(invoker.clone(), store.clone());
    let mut spec = BatchSpec {
        kind: "scene list".to_string(),
        brief: "a lighthouse mystery".to_string(),
        total_units: 6,
        total_batches: 3,
    };

    let first = orchestrator
        .generate_in_batches("b", &spec, "scenes")
        .await
        .unwrap();
    assert!(matches!(first, BatchOutcome::Aborted { batch_index: 1, .. }));

    spec.total_units = 9;
    let BatchOutcome::Complete { artifact } = orchestrator
        .generate_in_batches("b", &spec, "scenes")
        .await
        .unwrap()
    else {
        panic!("expected completion");
    };
    assert!(artifact.starts_with("skeleton of nine"));
    assert!(!artifact.contains("skeleton of six"));
    assert_eq!(invoker.calls_to(&CapabilityId::Drafting), 5);
}

#[tokio::test]
async fn cleared_session_starts_over() {
    let invoker = Arc::new(ScriptedInvoker::new());
    let store = Arc::new(MemoryCheckpointStore::new());
    let orchestrator = orchestrator(invoker.clone(), store.clone());

    orchestrator
        .run_turn("c", TurnInput::direct(CapabilityId::Ideation))
        .await
        .unwrap();
    orchestrator.clear_session("c").await.unwrap();
    assert!(orchestrator.session("c").await.unwrap().is_none());

    orchestrator
        .run_turn("c", TurnInput::direct(CapabilityId::Outline))
        .await
        .unwrap();
    let saved = store.load("c").await.unwrap().unwrap();
    assert!(saved.field("ideas").is_none());
}
