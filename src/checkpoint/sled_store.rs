//! Durable sled-backed checkpoint store. Snapshots are stored as JSON.

use crate::checkpoint::CheckpointStore;
use crate::error::StorageError;
use crate::session::SessionState;
use async_trait::async_trait;
use sled::{Db, Tree};
use std::io;
use std::path::Path;
use tracing::debug;

const TREE_CHECKPOINTS: &str = "session_checkpoints";

#[derive(Clone)]
pub struct SledCheckpointStore {
    db: Db,
    checkpoints: Tree,
}

impl SledCheckpointStore {
    pub fn new(db: Db) -> Result<Self, StorageError> {
        let checkpoints = db.open_tree(TREE_CHECKPOINTS).map_err(to_storage_io)?;
        Ok(Self { db, checkpoints })
    }

    /// Open (creating if needed) the database directory at `path`
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = sled::open(path).map_err(to_storage_io)?;
        Self::new(db)
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush().map_err(to_storage_io)?;
        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for SledCheckpointStore {
    async fn save(&self, session_id: &str, snapshot: &SessionState) -> Result<(), StorageError> {
        let value = serde_json::to_vec(snapshot).map_err(to_storage_data)?;
        self.checkpoints
            .insert(session_id.as_bytes(), value)
            .map_err(to_storage_io)?;
        self.flush()?;
        debug!(session_id, revision = snapshot.revision, "Checkpoint saved");
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<SessionState>, StorageError> {
        let Some(raw) = self
            .checkpoints
            .get(session_id.as_bytes())
            .map_err(to_storage_io)?
        else {
            return Ok(None);
        };
        let parsed = serde_json::from_slice(&raw).map_err(to_storage_data)?;
        Ok(Some(parsed))
    }

    async fn delete(&self, session_id: &str) -> Result<(), StorageError> {
        self.checkpoints
            .remove(session_id.as_bytes())
            .map_err(to_storage_io)?;
        self.flush()
    }

    async fn list_sessions(&self) -> Result<Vec<String>, StorageError> {
        let mut out = Vec::new();
        for result in self.checkpoints.iter() {
            let (key, _) = result.map_err(to_storage_io)?;
            out.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(out)
    }
}

fn to_storage_io(err: sled::Error) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::Other, err.to_string()))
}

fn to_storage_data(err: serde_json::Error) -> StorageError {
    StorageError::Serialization(err.to_string())
}
