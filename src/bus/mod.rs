//! Message bus subsystem.
//!
//! # Data Flow
//! ```text
//! Gateway ──publish──▶ [task topic] ──group "workers"──▶ one Worker
//! Worker  ──publish──▶ [completion topic] ─────────────▶ Completion Relay
//! ```
//!
//! # Design Decisions
//! - `MessageBus` is the only seam to broker infrastructure; it moves bytes
//! - `TaskBus` (client.rs) encodes/decodes envelopes on top of it
//! - Subscriptions buffer without bound; the broker is the durable copy
//! - `MemoryBus` (memory.rs) is the in-process broker used by the binary and tests

pub mod client;
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

pub use client::{EnvelopeStream, TaskBus};
pub use memory::MemoryBus;

#[derive(Debug, Error)]
pub enum BusError {
    /// Broker cannot be reached.
    #[error("bus unavailable: {0}")]
    Unavailable(String),

    /// Envelope could not be encoded for publishing.
    #[error(transparent)]
    Codec(#[from] crate::envelope::CodecError),
}

/// Byte-oriented broker interface.
#[async_trait]
pub trait MessageBus: Send + Sync + 'static {
    /// Publish one message to `topic`.
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), BusError>;

    /// Subscribe to `topic`.
    ///
    /// Members of the same `group` share deliveries: each message goes to exactly one
    /// of them. Subscribers without a group each receive every message.
    async fn subscribe(&self, topic: &str, group: Option<&str>) -> Result<Subscription, BusError>;
}

/// A live subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    topic: String,
    rx: mpsc::UnboundedReceiver<Bytes>,
}

impl Subscription {
    pub fn new(topic: impl Into<String>, rx: mpsc::UnboundedReceiver<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            rx,
        }
    }

    /// Next delivery, or `None` once the broker closes the subscription.
    pub async fn next(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}
