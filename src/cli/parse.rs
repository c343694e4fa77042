//! CLI parse: clap types for Stagehand. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Stagehand CLI - orchestration core for multi-capability story generation
#[derive(Parser)]
#[command(name = "stagehand")]
#[command(about = "Route requests across creative capabilities, run workflows, gate quality")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (replaces the workspace config files)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List registered capabilities
    Catalog {
        /// Output format (text, table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Validate a workflow plan file (JSON) against the registry
    Validate {
        /// Path to the plan
        plan: PathBuf,
    },
    /// Run one conversational turn
    Turn {
        /// Session identifier
        #[arg(long)]
        session: String,
        /// Route directly to this capability, skipping the decision step
        #[arg(long)]
        target: Option<String>,
        /// User message
        message: Option<String>,
    },
    /// Run the quality gate over a session field
    Review {
        #[arg(long)]
        session: String,
        /// Field holding the artifact
        #[arg(long, default_value = "draft")]
        field: String,
    },
    /// Generate a long artifact across several batches
    Generate {
        #[arg(long)]
        session: String,
        /// What is produced, e.g. "chapter outline"
        #[arg(long)]
        kind: String,
        /// Creative brief
        #[arg(long)]
        brief: String,
        /// Units in the whole artifact
        #[arg(long)]
        units: u32,
        /// Number of batches
        #[arg(long, default_value = "1")]
        batches: u32,
        /// Field receiving the artifact (defaults to the kind)
        #[arg(long)]
        field: Option<String>,
    },
    /// Inspect or clear stored sessions
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// List stored session ids
    List,
    /// Show a session checkpoint
    Show {
        session: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Delete a session checkpoint
    Clear { session: String },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Validate the effective configuration
    Validate,
}
