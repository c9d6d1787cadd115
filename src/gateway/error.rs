use std::time::Duration;

use thiserror::Error;

use crate::bus::BusError;
use crate::envelope::{CorrelationId, InvalidId};
use crate::store::{ReadError, StoreError};

/// Errors surfaced by [`Gateway`](super::Gateway) operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The task could not be published; the caller must retry.
    #[error("failed to publish task {id}: {source}")]
    Publish { id: CorrelationId, source: BusError },

    /// The store could not be reached; the result may still arrive.
    #[error("correlation store unavailable: {0}")]
    Store(#[from] StoreError),

    /// The stored completion for this id cannot be decoded.
    #[error("completion record for {id} is corrupt")]
    Corrupt { id: CorrelationId },

    /// No completion within the wait budget.
    #[error("no completion for {id} within {waited:?}")]
    Timeout { id: CorrelationId, waited: Duration },

    /// A completion for this caller-chosen id has not been retrieved yet.
    #[error("correlation id {id} already has a pending completion")]
    IdInUse { id: CorrelationId },

    #[error("invalid correlation id: {0}")]
    InvalidId(#[from] InvalidId),
}

impl From<ReadError> for GatewayError {
    fn from(e: ReadError) -> Self {
        match e {
            ReadError::Store(e) => GatewayError::Store(e),
            ReadError::Corrupt { id, source } => {
                tracing::error!(id = %id, error = %source, "Corrupt completion record");
                GatewayError::Corrupt { id }
            }
        }
    }
}

impl GatewayError {
    /// Whether trying the same call again can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::Publish { .. } | GatewayError::Store(_) | GatewayError::Timeout { .. }
        )
    }
}
