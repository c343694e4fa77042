//! Stagehand: orchestration core for multi-capability content generation
//!
//! Routes each user turn to the right creative capability, decomposes requests into validated
//! multi-step workflows and resumes them across turns, gates artifacts through a bounded
//! review/refine loop, and produces long artifacts in batches. Session state is checkpointed
//! after every mutating step.

pub mod batch;
pub mod capability;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod provider;
pub mod quality;
pub mod router;
pub mod session;
pub mod workflow;

pub use capability::{CapabilityId, CapabilityInvoker, CapabilityRegistry, RouteTarget};
pub use error::{CapabilityError, OrchestrationError, StorageError};
pub use orchestrator::{Collaborators, SessionOrchestrator, TurnInput, TurnReport};
