//! Batched long-form generation with cross-batch context carry.

use crate::batch::cursor::BatchCursor;
use crate::batch::instruction::batch_instruction;
use crate::capability::{CapabilityId, CapabilityInvoker};
use crate::config::BatchConfig;
use crate::error::OrchestrationError;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// A batch that failed; the cursor still points at it so a retry resumes there.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("batch {batch_index} failed: {reason}")]
pub struct BatchFailure {
    pub batch_index: u32,
    pub reason: String,
}

impl From<BatchFailure> for OrchestrationError {
    fn from(failure: BatchFailure) -> Self {
        OrchestrationError::BatchAborted {
            batch_index: failure.batch_index,
            reason: failure.reason,
        }
    }
}

pub struct BatchAccumulator {
    generator: Arc<dyn CapabilityInvoker>,
    capability: CapabilityId,
    config: BatchConfig,
}

impl BatchAccumulator {
    pub fn new(generator: Arc<dyn CapabilityInvoker>, config: BatchConfig) -> Self {
        Self {
            generator,
            capability: CapabilityId::Drafting,
            config,
        }
    }

    /// Capability asked to generate each batch (drafting by default)
    pub fn with_capability(mut self, capability: CapabilityId) -> Self {
        self.capability = capability;
        self
    }

    /// Generate the batch under the cursor and commit it.
    ///
    /// On failure the cursor is left exactly as it was.
    pub async fn run_batch(&self, cursor: &mut BatchCursor) -> Result<(), BatchFailure> {
        let batch_index = cursor.current_index;
        if cursor.is_complete() {
            return Err(BatchFailure {
                batch_index,
                reason: "sequence already complete".to_string(),
            });
        }

        let instruction = batch_instruction(cursor, self.config.context_window_chars);
        let text = self
            .generator
            .invoke(&self.capability, &instruction)
            .await
            .map_err(|err| BatchFailure {
                batch_index,
                reason: err.to_string(),
            })?;

        let text = text.trim();
        if text.is_empty() {
            return Err(BatchFailure {
                batch_index,
                reason: "generator returned no text".to_string(),
            });
        }

        cursor.commit(text, &self.config.separator);
        debug!(
            batch_index,
            total_batches = cursor.total_batches,
            role = ?cursor.role_for(batch_index),
            "Committed batch"
        );
        Ok(())
    }

    /// Run every remaining batch, starting at the cursor's current index.
    pub async fn run(&self, cursor: &mut BatchCursor) -> Result<String, BatchFailure> {
        while !cursor.is_complete() {
            if let Err(failure) = self.run_batch(cursor).await {
                warn!(batch_index = failure.batch_index, reason = %failure.reason, "Batch sequence aborted");
                return Err(failure);
            }
        }
        info!(total_batches = cursor.total_batches, "Batch sequence complete");
        Ok(cursor.accumulated.clone())
    }

    /// Final artifact, once every batch is committed
    pub fn finalize(cursor: &BatchCursor) -> Option<&str> {
        cursor.is_complete().then_some(cursor.accumulated.as_str())
    }
}
