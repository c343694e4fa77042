//! Error types for the Stagehand orchestration core.

use thiserror::Error;

/// Storage-related errors (checkpoint backends)
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Snapshot serialization failed: {0}")]
    Serialization(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Failures raised by a capability invocation (decision-making, reviewer, refiner,
/// batch generation, dispatched capabilities).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("Capability {capability} timed out after {seconds}s")]
    Timeout { capability: String, seconds: u64 },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Capability rejected the request: {0}")]
    Rejected(String),
}

/// Orchestration errors
///
/// Most variants describe expected failure modes that the core converts into state updates
/// (fail-closed routing, blocked gates, aborted batches). Only `Storage` and `Config` are
/// normally returned across the core boundary.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("Malformed decision: {0}")]
    MalformedDecision(String),

    #[error("Invalid workflow: {0}")]
    InvalidWorkflow(String),

    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    #[error("Upstream artifact is empty")]
    EmptyUpstreamArtifact,

    #[error("Quality record could not be parsed: {0}")]
    UnparsableQualityRecord(String),

    #[error("Refiner output could not be parsed: {0}")]
    UnparsableRefinerOutput(String),

    #[error("Batch {batch_index} aborted: {reason}")]
    BatchAborted { batch_index: u32, reason: String },

    #[error("Capability invocation failed: {0}")]
    Capability(#[from] CapabilityError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for OrchestrationError {
    fn from(err: config::ConfigError) -> Self {
        OrchestrationError::ConfigError(err.to_string())
    }
}
