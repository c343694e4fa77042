//! CLI presentation: text, table and JSON rendering of command results.

use crate::capability::{CapabilityRegistry, RouteTarget};
use crate::error::{OrchestrationError, StorageError};
use crate::orchestrator::{BatchOutcome, TurnReport};
use crate::quality::{GateOutcome, GatePhase};
use crate::session::{summarize, SessionState};
use crate::workflow::{PlanDefect, WorkflowPlan};
use comfy_table::Table;
use serde::Serialize;
use std::fmt::Write;

fn to_json<T: Serialize>(value: &T) -> Result<String, OrchestrationError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| OrchestrationError::Storage(StorageError::Serialization(e.to_string())))
}

pub fn format_catalog(
    registry: &CapabilityRegistry,
    format: &str,
) -> Result<String, OrchestrationError> {
    match format {
        "json" => to_json(&registry.list()),
        "text" => Ok(registry.describe_for_prompt()),
        _ => {
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["Id", "Label", "Category", "Inputs", "Outputs"]);
            for descriptor in registry.list() {
                table.add_row(vec![
                    descriptor.id.to_string(),
                    descriptor.label.clone(),
                    descriptor.category.to_string(),
                    descriptor.inputs.join(", "),
                    descriptor.outputs.join(", "),
                ]);
            }
            Ok(table.to_string())
        }
    }
}

pub fn format_plan_validation(plan: &WorkflowPlan, result: &Result<(), PlanDefect>) -> String {
    match result {
        Ok(()) => {
            let mut out = format!("Plan is valid: {} steps\n", plan.len());
            for (i, step) in plan.steps.iter().enumerate() {
                let _ = writeln!(out, "  {}. {} -> {}: {}", i + 1, step.id, step.target, step.task);
            }
            out
        }
        Err(defect) => format!("Plan is invalid: {}", defect),
    }
}

pub fn format_turn_report(report: &TurnReport) -> String {
    let mut out = String::new();
    for record in &report.dispatched {
        let mark = if record.succeeded { "ok" } else { "failed" };
        match &record.step_id {
            Some(step_id) => {
                let _ = writeln!(out, "[{}] {} ({})", mark, record.target, step_id);
            }
            None => {
                let _ = writeln!(out, "[{}] {}", mark, record.target);
            }
        }
    }
    if let Some(RouteTarget::End) = report.final_target {
        if report.dispatched.is_empty() {
            out.push_str("Nothing to run\n");
        }
    }
    if !report.status.is_empty() {
        let _ = writeln!(out, "{}", report.status);
    }
    if let Some(fault) = &report.fault {
        let _ = writeln!(
            out,
            "Error in {}: {} (state kept at revision {})",
            fault.capability, fault.message, fault.last_good_revision
        );
    }
    out.trim_end().to_string()
}

pub fn format_gate_outcome(outcome: &GateOutcome) -> String {
    let mut out = String::new();
    let verdict = match &outcome.phase {
        GatePhase::Accepted { forced: false } => "accepted".to_string(),
        GatePhase::Accepted { forced: true } => "accepted after revision limit".to_string(),
        GatePhase::Blocked { reason } => format!("blocked: {}", reason),
        other => format!("{:?}", other),
    };
    let _ = writeln!(out, "Verdict: {}", verdict);
    let _ = writeln!(out, "Revisions: {}", outcome.revision_count);
    if let Some(record) = &outcome.record {
        let _ = writeln!(out, "Score: {}", record.score);
        for issue in &record.issues {
            let _ = writeln!(
                out,
                "  - [{:?}] {}: {}",
                issue.severity, issue.category, issue.description
            );
        }
    }
    out.trim_end().to_string()
}

pub fn format_batch_outcome(outcome: &BatchOutcome) -> String {
    match outcome {
        BatchOutcome::Complete { artifact } => artifact.clone(),
        BatchOutcome::Aborted {
            batch_index,
            reason,
        } => format!(
            "Generation stopped at part {}: {}\nRun the same command again to resume.",
            batch_index + 1,
            reason
        ),
    }
}

pub fn format_session(state: &SessionState, format: &str) -> Result<String, OrchestrationError> {
    if format == "json" {
        return to_json(state);
    }
    let mut out = String::new();
    let _ = writeln!(out, "Session: {}", state.session_id);
    let _ = writeln!(out, "Revision: {}", state.revision);
    let _ = writeln!(out, "Updated: {}", state.updated_at.to_rfc3339());
    if !state.status.is_empty() {
        let _ = writeln!(out, "Status: {}", state.status);
    }
    out.push_str(&summarize(state, 8));
    if let Some(fault) = &state.fault {
        let _ = write!(out, "\nFault: {} in {}", fault.message, fault.capability);
    }
    Ok(out.trim_end().to_string())
}

pub fn format_session_list(ids: &[String]) -> String {
    if ids.is_empty() {
        return "No sessions".to_string();
    }
    ids.join("\n")
}

pub fn format_config_validation(errors: &[String]) -> String {
    if errors.is_empty() {
        return "Configuration is valid".to_string();
    }
    let mut out = String::from("Configuration is invalid:\n");
    for e in errors {
        let _ = writeln!(out, "  - {}", e);
    }
    out.trim_end().to_string()
}
