//! In-process checkpoint store, used by tests and the `memory` backend.

use crate::checkpoint::CheckpointStore;
use crate::error::StorageError;
use crate::session::SessionState;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    snapshots: RwLock<HashMap<String, SessionState>>,
    saves: AtomicUsize,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save` calls so far
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn save(&self, session_id: &str, snapshot: &SessionState) -> Result<(), StorageError> {
        self.snapshots
            .write()
            .insert(session_id.to_string(), snapshot.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<SessionState>, StorageError> {
        Ok(self.snapshots.read().get(session_id).cloned())
    }

    async fn delete(&self, session_id: &str) -> Result<(), StorageError> {
        self.snapshots.write().remove(session_id);
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<String>, StorageError> {
        let mut ids: Vec<String> = self.snapshots.read().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
