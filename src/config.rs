//! Configuration System
//!
//! Layered configuration for the orchestration core: built-in defaults, the user's global
//! file, workspace files and `STAGEHAND__*` environment overrides. Each component takes its
//! own section by value.

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use crate::provider::ProviderConfig;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StagehandConfig {
    #[serde(default)]
    pub gate: GateConfig,

    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub router: RouterConfig,

    #[serde(default)]
    pub checkpoint: CheckpointConfig,

    #[serde(default)]
    pub invocation: InvocationConfig,

    /// Model provider backing the capabilities; absent means no live capabilities
    #[serde(default)]
    pub provider: Option<ProviderConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Quality gate policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Minimum reviewer score (0-100) accepted without refinement
    #[serde(default = "default_accept_threshold")]
    pub accept_threshold: u8,

    /// Refinement rounds before a forced pass
    #[serde(default = "default_max_revisions")]
    pub max_revisions: u32,
}

fn default_accept_threshold() -> u8 {
    80
}

fn default_max_revisions() -> u32 {
    3
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            accept_threshold: default_accept_threshold(),
            max_revisions: default_max_revisions(),
        }
    }
}

/// Batched generation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Trailing characters of accumulated text handed to middle batches
    #[serde(default = "default_context_window_chars")]
    pub context_window_chars: usize,

    #[serde(default = "default_separator")]
    pub separator: String,
}

fn default_context_window_chars() -> usize {
    4000
}

fn default_separator() -> String {
    "\n\n---\n\n".to_string()
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            context_window_chars: default_context_window_chars(),
            separator: default_separator(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Status shown when a decision cannot be used
    #[serde(default = "default_fallback_status")]
    pub fallback_status: String,

    /// Selections listed in the session summary
    #[serde(default = "default_summary_item_limit")]
    pub summary_item_limit: usize,

    /// Upper bound on capabilities dispatched in one turn
    #[serde(default = "default_max_steps_per_turn")]
    pub max_steps_per_turn: usize,

    /// Conversation turns kept on a session; older turns are dropped
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_fallback_status() -> String {
    "Sorry, I couldn't work out what to do next. Could you rephrase your request?".to_string()
}

fn default_summary_item_limit() -> usize {
    8
}

fn default_max_steps_per_turn() -> usize {
    16
}

fn default_history_limit() -> usize {
    200
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            fallback_status: default_fallback_status(),
            summary_item_limit: default_summary_item_limit(),
            max_steps_per_turn: default_max_steps_per_turn(),
            history_limit: default_history_limit(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointBackend {
    Memory,
    Sled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    #[serde(default = "default_checkpoint_backend")]
    pub backend: CheckpointBackend,

    /// Database directory for the sled backend, relative to the workspace root
    #[serde(default = "default_checkpoint_path")]
    pub path: PathBuf,
}

fn default_checkpoint_backend() -> CheckpointBackend {
    CheckpointBackend::Sled
}

fn default_checkpoint_path() -> PathBuf {
    PathBuf::from(".stagehand/checkpoints")
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            backend: default_checkpoint_backend(),
            path: default_checkpoint_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationConfig {
    /// Per-call timeout for capability invocations
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for InvocationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Gate(String),
    Batch(String),
    Router(String),
    Checkpoint(String),
    Invocation(String),
    Provider(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Gate(msg) => write!(f, "Gate: {}", msg),
            ValidationError::Batch(msg) => write!(f, "Batch: {}", msg),
            ValidationError::Router(msg) => write!(f, "Router: {}", msg),
            ValidationError::Checkpoint(msg) => write!(f, "Checkpoint: {}", msg),
            ValidationError::Invocation(msg) => write!(f, "Invocation: {}", msg),
            ValidationError::Provider(msg) => write!(f, "Provider: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl StagehandConfig {
    /// Validate the entire configuration, reporting every problem found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.gate.accept_threshold > 100 {
            errors.push(ValidationError::Gate(format!(
                "accept_threshold must be within 0..=100, got {}",
                self.gate.accept_threshold
            )));
        }

        if self.batch.separator.is_empty() {
            errors.push(ValidationError::Batch(
                "separator cannot be empty".to_string(),
            ));
        }

        if self.router.max_steps_per_turn == 0 {
            errors.push(ValidationError::Router(
                "max_steps_per_turn must be at least 1".to_string(),
            ));
        }
        if self.router.history_limit < 2 {
            errors.push(ValidationError::Router(
                "history_limit must keep at least one exchange (2 turns)".to_string(),
            ));
        }
        if self.router.fallback_status.trim().is_empty() {
            errors.push(ValidationError::Router(
                "fallback_status cannot be empty".to_string(),
            ));
        }

        if self.checkpoint.backend == CheckpointBackend::Sled
            && self.checkpoint.path.as_os_str().is_empty()
        {
            errors.push(ValidationError::Checkpoint(
                "path cannot be empty for the sled backend".to_string(),
            ));
        }

        if self.invocation.timeout_secs == 0 {
            errors.push(ValidationError::Invocation(
                "timeout_secs must be at least 1".to_string(),
            ));
        }

        if let Some(provider) = &self.provider {
            if let Err(e) = provider.validate() {
                errors.push(ValidationError::Provider(e));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
