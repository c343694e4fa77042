//! Invocation seam for capabilities backed by an external model.

use crate::capability::id::CapabilityId;
use crate::error::CapabilityError;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Invokes a capability with a rendered instruction and returns its raw text reply.
///
/// Every call is a potentially long suspension point. Implementations must be cheap to
/// share across sessions.
#[async_trait]
pub trait CapabilityInvoker: Send + Sync {
    async fn invoke(
        &self,
        capability: &CapabilityId,
        instruction: &str,
    ) -> Result<String, CapabilityError>;
}

/// Bound a capability call by `timeout`, mapping expiry to [`CapabilityError::Timeout`].
pub async fn with_timeout<F>(
    capability: &CapabilityId,
    timeout: Duration,
    call: F,
) -> Result<String, CapabilityError>
where
    F: Future<Output = Result<String, CapabilityError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(CapabilityError::Timeout {
            capability: capability.to_string(),
            seconds: timeout.as_secs(),
        }),
    }
}
