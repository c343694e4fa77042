//! Checkpoint persistence: durable snapshots of session state keyed by session id.
//!
//! The orchestrator saves after every state-mutating step and loads once per turn.

pub mod memory;
pub mod sled_store;

use crate::error::StorageError;
use crate::session::SessionState;
use async_trait::async_trait;

pub use memory::MemoryCheckpointStore;
pub use sled_store::SledCheckpointStore;

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn save(&self, session_id: &str, snapshot: &SessionState) -> Result<(), StorageError>;

    async fn load(&self, session_id: &str) -> Result<Option<SessionState>, StorageError>;

    async fn delete(&self, session_id: &str) -> Result<(), StorageError>;

    /// Known session ids in ascending order
    async fn list_sessions(&self) -> Result<Vec<String>, StorageError>;
}
