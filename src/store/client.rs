//! Typed correlation store client.

use std::sync::Arc;

use thiserror::Error;

use crate::envelope::{CodecError, CorrelationId, Envelope};
use crate::store::{KeyValueStore, StoreError};

/// Outcome of a lookup that reached the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(Envelope),
    NotFound,
}

/// A lookup that did not produce an answer.
#[derive(Debug, Error)]
pub enum ReadError {
    /// Transient; the record may still be there.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A record exists but is not an envelope. It will never become one.
    #[error("stored record for {id} is corrupt: {source}")]
    Corrupt { id: CorrelationId, source: CodecError },
}

/// Envelope-level view of the key-value store, keyed by correlation id.
#[derive(Clone)]
pub struct CorrelationStore {
    kv: Arc<dyn KeyValueStore>,
}

impl CorrelationStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Write (or overwrite) the record for `envelope.id`.
    pub async fn record(&self, envelope: &Envelope) -> Result<(), StoreError> {
        let bytes = envelope.to_bytes()?;
        self.kv.put(envelope.id.as_str(), bytes).await
    }

    /// Read and remove the record for `id`.
    pub async fn take(&self, id: &CorrelationId) -> Result<Lookup, ReadError> {
        let raw = self.kv.take(id.as_str()).await?;
        decode(id, raw)
    }

    /// Read without consuming.
    pub async fn peek(&self, id: &CorrelationId) -> Result<Lookup, ReadError> {
        let raw = self.kv.get(id.as_str()).await?;
        decode(id, raw)
    }

    pub async fn purge_expired(&self) -> Result<usize, StoreError> {
        self.kv.purge_expired().await
    }
}

fn decode(id: &CorrelationId, raw: Option<bytes::Bytes>) -> Result<Lookup, ReadError> {
    match raw {
        None => Ok(Lookup::NotFound),
        Some(bytes) => Envelope::from_bytes(&bytes)
            .map(Lookup::Found)
            .map_err(|source| ReadError::Corrupt {
                id: id.clone(),
                source,
            }),
    }
}
