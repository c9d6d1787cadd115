//! Correlation store subsystem.
//!
//! # Data Flow
//! ```text
//! Completion Relay ──put(id, envelope)──▶ KeyValueStore ◀──take(id)── Gateway
//!                                              ▲
//!                        TtlSweeper ──purge_expired──┘
//! ```
//!
//! # Design Decisions
//! - Absence is `Ok(None)`, never an error; unreachable is `Err(StoreError)`
//! - Gateway reads with `take` (atomic get-and-delete) so a completion is delivered once
//! - Orphaned completions expire through the store's TTL, not through the Gateway

pub mod client;
pub mod memory;
pub mod sweeper;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use client::{CorrelationStore, Lookup, ReadError};
pub use memory::MemoryStore;
pub use sweeper::TtlSweeper;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Store cannot be reached; worth retrying.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Envelope could not be encoded for writing.
    #[error(transparent)]
    Codec(#[from] crate::envelope::CodecError),
}

/// Byte-oriented key-value interface.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    async fn put(&self, key: &str, value: Bytes) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Read and remove in one step.
    ///
    /// The default is get-then-delete; backends with an atomic primitive override it.
    async fn take(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let value = self.get(key).await?;
        if value.is_some() {
            self.delete(key).await?;
        }
        Ok(value)
    }

    /// Drop expired records, returning how many were removed.
    async fn purge_expired(&self) -> Result<usize, StoreError>;
}
