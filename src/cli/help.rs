//! Command-name contract used for log spans.

use crate::cli::parse::{Commands, ConfigCommands, SessionCommands};

/// Dotted command name (e.g. "session.show", "turn").
pub fn command_name(command: &Commands) -> String {
    match command {
        Commands::Catalog { .. } => "catalog".to_string(),
        Commands::Validate { .. } => "validate".to_string(),
        Commands::Turn { .. } => "turn".to_string(),
        Commands::Review { .. } => "review".to_string(),
        Commands::Generate { .. } => "generate".to_string(),
        Commands::Session { command } => format!("session.{}", session_command_name(command)),
        Commands::Config { command } => format!("config.{}", config_command_name(command)),
    }
}

pub fn session_command_name(command: &SessionCommands) -> &'static str {
    match command {
        SessionCommands::List => "list",
        SessionCommands::Show { .. } => "show",
        SessionCommands::Clear { .. } => "clear",
    }
}

pub fn config_command_name(command: &ConfigCommands) -> &'static str {
    match command {
        ConfigCommands::Show => "show",
        ConfigCommands::Validate => "validate",
    }
}

/// Whether the command needs a live model provider
pub fn needs_provider(command: &Commands) -> bool {
    matches!(
        command,
        Commands::Turn { .. } | Commands::Review { .. } | Commands::Generate { .. }
    )
}
