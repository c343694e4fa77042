//! Property tests for plan validation and step continuation

use proptest::prelude::*;
use stagehand::capability::{CapabilityId, CapabilityRegistry};
use stagehand::session::SessionState;
use stagehand::workflow::{
    Advance, ContinuationEngine, ExecutionCursor, PlanDefect, WorkflowPlan, WorkflowStep,
    WorkflowValidator,
};
use std::sync::Arc;

const TARGETS: [CapabilityId; 6] = [
    CapabilityId::Ideation,
    CapabilityId::WorldBuilding,
    CapabilityId::CharacterDesign,
    CapabilityId::Outline,
    CapabilityId::Drafting,
    CapabilityId::Summarizer,
];

/// Plan whose step i may depend only on steps before it, per the edge mask
fn dag_plan(edges: &[Vec<bool>]) -> WorkflowPlan {
    let steps = edges
        .iter()
        .enumerate()
        .map(|(i, mask)| {
            let deps: Vec<String> = mask
                .iter()
                .take(i)
                .enumerate()
                .filter(|(_, on)| **on)
                .map(|(j, _)| format!("s{}", j))
                .collect();
            WorkflowStep::new(
                format!("s{}", i),
                TARGETS[i % TARGETS.len()].clone(),
                format!("task {}", i),
            )
            .depends_on(deps)
        })
        .collect();
    WorkflowPlan::new(steps)
}

fn edge_masks() -> impl Strategy<Value = Vec<Vec<bool>>> {
    (1usize..10).prop_flat_map(|n| prop::collection::vec(prop::collection::vec(any::<bool>(), n), n))
}

proptest! {
    #[test]
    fn forward_only_dependencies_validate(edges in edge_masks()) {
        let registry = CapabilityRegistry::with_defaults();
        let plan = dag_plan(&edges);
        prop_assert!(WorkflowValidator::new(&registry).validate(&plan).is_ok());
    }

    #[test]
    fn back_edge_is_a_cycle(n in 2usize..10) {
        let registry = CapabilityRegistry::with_defaults();
        let mut steps: Vec<WorkflowStep> = (0..n)
            .map(|i| {
                let step = WorkflowStep::new(format!("s{}", i), CapabilityId::Outline, "t");
                if i == 0 { step } else { step.depends_on([format!("s{}", i - 1)]) }
            })
            .collect();
        steps[0].depends_on.push(format!("s{}", n - 1));

        let defect = WorkflowValidator::new(&registry)
            .validate(&WorkflowPlan::new(steps))
            .unwrap_err();
        prop_assert!(matches!(defect, PlanDefect::Cycle(_)), "got {:?}", defect);
    }

    #[test]
    fn dangling_dependency_is_rejected(edges in edge_masks(), missing in "[a-z]{3,8}") {
        let registry = CapabilityRegistry::with_defaults();
        let mut plan = dag_plan(&edges);
        let last = plan.steps.len() - 1;
        plan.steps[last].depends_on.push(format!("missing-{}", missing));

        let defect = WorkflowValidator::new(&registry).validate(&plan).unwrap_err();
        prop_assert!(
            matches!(defect, PlanDefect::DanglingDependency { .. }),
            "got {:?}",
            defect
        );
    }

    #[test]
    fn advancing_visits_every_step_once(n in 1usize..10) {
        let registry = Arc::new(CapabilityRegistry::with_defaults());
        let engine = ContinuationEngine::new(registry);
        let plan = dag_plan(&vec![vec![false; n]; n]);

        let mut state = SessionState::new("p");
        state.plan = Some(plan.clone());
        state.cursor = Some(ExecutionCursor::start());

        let mut visited = vec![engine.current(&state).unwrap().step_id];
        loop {
            match engine.advance(&mut state) {
                Advance::Next(step) => visited.push(step.step_id),
                Advance::PlanComplete { error, .. } => {
                    prop_assert!(error.is_none());
                    break;
                }
            }
        }

        let expected: Vec<String> = plan.steps.iter().map(|s| s.id.clone()).collect();
        prop_assert_eq!(visited, expected);
        prop_assert!(state.plan.is_none());
        prop_assert!(state.cursor.is_none());
    }

    #[test]
    fn current_step_lookup_is_pure(n in 1usize..8, at in 0usize..8) {
        let registry = Arc::new(CapabilityRegistry::with_defaults());
        let engine = ContinuationEngine::new(registry);
        let mut state = SessionState::new("p");
        state.plan = Some(dag_plan(&vec![vec![false; n]; n]));
        state.cursor = Some(ExecutionCursor { index: at % n, ..ExecutionCursor::start() });

        let before = state.clone();
        let first = engine.current(&state);
        let second = engine.current(&state);
        prop_assert_eq!(first, second);
        prop_assert_eq!(state, before);
    }
}
