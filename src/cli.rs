//! CLI domain: parse, route, help and presentation only.
//! No domain orchestration; a single route table dispatches to the orchestrator.

mod help;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use parse::{Cli, Commands, ConfigCommands, SessionCommands};
pub use route::RunContext;

use crate::error::OrchestrationError;

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &OrchestrationError) -> String {
    match e {
        OrchestrationError::ConfigError(msg) => format!("Configuration error: {}", msg),
        other => other.to_string(),
    }
}
