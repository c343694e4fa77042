//! Structural and referential soundness check for proposed workflow plans.

use crate::capability::{CapabilityId, CapabilityRegistry};
use crate::workflow::plan::WorkflowPlan;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Why a plan was rejected. The display text is surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanDefect {
    #[error("duplicate step id '{0}'")]
    DuplicateStepId(String),

    #[error("step '{step_id}' targets unknown capability '{target}'")]
    UnknownCapability { step_id: String, target: CapabilityId },

    #[error("step '{0}' depends on itself")]
    SelfDependency(String),

    #[error("step '{step_id}' depends on unknown step '{dependency}'")]
    DanglingDependency { step_id: String, dependency: String },

    #[error("dependency cycle detected at step '{0}'")]
    Cycle(String),
}

/// Validates plans against a registry.
pub struct WorkflowValidator<'a> {
    registry: &'a CapabilityRegistry,
}

impl<'a> WorkflowValidator<'a> {
    pub fn new(registry: &'a CapabilityRegistry) -> Self {
        Self { registry }
    }

    /// Check ids, targets, dependencies and acyclicity, in that order.
    pub fn validate(&self, plan: &WorkflowPlan) -> Result<(), PlanDefect> {
        let mut seen = HashSet::new();
        for step in &plan.steps {
            if !seen.insert(step.id.as_str()) {
                return Err(PlanDefect::DuplicateStepId(step.id.clone()));
            }
        }

        for step in &plan.steps {
            if !step.target.is_recognized() || !self.registry.contains(&step.target) {
                return Err(PlanDefect::UnknownCapability {
                    step_id: step.id.clone(),
                    target: step.target.clone(),
                });
            }
        }

        for step in &plan.steps {
            for dep in &step.depends_on {
                if dep == &step.id {
                    return Err(PlanDefect::SelfDependency(step.id.clone()));
                }
                if !seen.contains(dep.as_str()) {
                    return Err(PlanDefect::DanglingDependency {
                        step_id: step.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        detect_cycle(plan)
    }
}

/// Iterative depth-first search over `depends_on` edges.
///
/// A node is on the path from the moment it is entered until all of its dependencies are
/// resolved. Reaching a node that is still on the path closes a cycle.
fn detect_cycle(plan: &WorkflowPlan) -> Result<(), PlanDefect> {
    let edges: BTreeMap<&str, Vec<&str>> = plan
        .steps
        .iter()
        .map(|step| {
            (
                step.id.as_str(),
                step.depends_on.iter().map(String::as_str).collect(),
            )
        })
        .collect();

    let mut on_path: HashSet<&str> = HashSet::new();
    let mut resolved: HashSet<&str> = HashSet::new();

    for step in &plan.steps {
        let root = step.id.as_str();
        if resolved.contains(root) {
            continue;
        }

        // (node, next edge to explore)
        let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
        on_path.insert(root);

        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            let deps = edges.get(node).map(Vec::as_slice).unwrap_or(&[]);

            if let Some(&dep) = deps.get(next) {
                frame.1 += 1;
                if on_path.contains(dep) {
                    return Err(PlanDefect::Cycle(dep.to_string()));
                }
                if !resolved.contains(dep) {
                    on_path.insert(dep);
                    stack.push((dep, 0));
                }
            } else {
                on_path.remove(node);
                resolved.insert(node);
                stack.pop();
            }
        }
    }

    Ok(())
}
