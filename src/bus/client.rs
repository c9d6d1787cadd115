//! Typed task bus client.

use std::sync::Arc;

use crate::bus::{BusError, MessageBus, Subscription};
use crate::config::BusConfig;
use crate::envelope::{CodecError, Envelope};

/// Envelope-level view of the bus, bound to the configured topic names.
#[derive(Clone)]
pub struct TaskBus {
    bus: Arc<dyn MessageBus>,
    topics: BusConfig,
}

impl TaskBus {
    pub fn new(bus: Arc<dyn MessageBus>, topics: BusConfig) -> Self {
        Self { bus, topics }
    }

    /// Publish a submitted task for the worker pool.
    pub async fn publish_task(&self, envelope: &Envelope) -> Result<(), BusError> {
        self.publish(&self.topics.task_topic, envelope).await
    }

    /// Publish a finished task for the completion relay.
    pub async fn publish_completion(&self, envelope: &Envelope) -> Result<(), BusError> {
        self.publish(&self.topics.completion_topic, envelope).await
    }

    /// Join the worker consumer group on the task topic.
    pub async fn subscribe_tasks(&self) -> Result<EnvelopeStream, BusError> {
        let sub = self
            .bus
            .subscribe(&self.topics.task_topic, Some(&self.topics.worker_group))
            .await?;
        Ok(EnvelopeStream { inner: sub })
    }

    /// Follow every completion.
    pub async fn subscribe_completions(&self) -> Result<EnvelopeStream, BusError> {
        let sub = self.bus.subscribe(&self.topics.completion_topic, None).await?;
        Ok(EnvelopeStream { inner: sub })
    }

    pub fn topics(&self) -> &BusConfig {
        &self.topics
    }

    async fn publish(&self, topic: &str, envelope: &Envelope) -> Result<(), BusError> {
        let bytes = envelope.to_bytes()?;
        self.bus.publish(topic, bytes).await?;
        tracing::debug!(id = %envelope.id, topic = %topic, status = envelope.status.as_str(), "Published envelope");
        Ok(())
    }
}

/// Decoding wrapper over a [`Subscription`].
pub struct EnvelopeStream {
    inner: Subscription,
}

impl EnvelopeStream {
    /// Next delivery. A delivery that fails to decode is returned as an error so the
    /// consumer can log and drop it; the stream itself keeps going.
    pub async fn next(&mut self) -> Option<Result<Envelope, CodecError>> {
        let raw = self.inner.next().await?;
        Some(Envelope::from_bytes(&raw))
    }

    pub fn topic(&self) -> &str {
        self.inner.topic()
    }
}
