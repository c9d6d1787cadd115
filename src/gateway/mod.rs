//! Request-correlation gateway.
//!
//! # Responsibilities
//! - Mint correlation ids and publish submitted tasks
//! - Hand completions back exactly once (atomic take from the store)
//! - Hold a caller until its completion appears, or a deadline passes
//!
//! # Data Flow
//! ```text
//! ticket mode:  submit ──▶ id to caller ... later: retrieve(id) ──▶ Envelope | NotFound
//!
//! wait mode:    watch() ─▶ submit ─▶ wait_for(id)
//!                                      loop {
//!                                        take(id) hit  → return
//!                                        miss / store error → sleep(backoff) or notifier wakes us
//!                                      } until timeout
//! ```
//!
//! # Design Decisions
//! - The gateway holds no per-task state; everything it needs is in the store
//! - A transient store error inside a wait is "not ready yet", never fatal
//! - A corrupt record ends the wait at once; retrying cannot fix it
//! - Dropping a wait future stops its polling; the task itself still runs to completion

pub mod error;
pub mod notifier;

use std::time::{Duration, Instant};

use tokio::time;

pub use error::GatewayError;
pub use notifier::{CompletionNotifier, CompletionWatch};

use crate::bus::TaskBus;
use crate::config::GatewayConfig;
use crate::envelope::{CorrelationId, Envelope, Payload};
use crate::observability::metrics;
use crate::resilience::Backoff;
use crate::store::{CorrelationStore, Lookup};

#[derive(Clone)]
pub struct Gateway {
    bus: TaskBus,
    store: CorrelationStore,
    notifier: CompletionNotifier,
    config: GatewayConfig,
}

impl Gateway {
    pub fn new(
        bus: TaskBus,
        store: CorrelationStore,
        notifier: CompletionNotifier,
        config: GatewayConfig,
    ) -> Self {
        Self {
            bus,
            store,
            notifier,
            config,
        }
    }

    /// Publish `msg` under a freshly minted id. Returns the `Processing` envelope.
    pub async fn submit(&self, msg: Payload) -> Result<Envelope, GatewayError> {
        self.publish(Envelope::new(CorrelationId::generate(), msg)).await
    }

    /// Publish `msg` under a caller-chosen id.
    ///
    /// Refused while a completion for `id` is still unretrieved, otherwise a wait on
    /// the new task would pick up the old result.
    pub async fn submit_with_id(
        &self,
        id: CorrelationId,
        msg: Payload,
    ) -> Result<Envelope, GatewayError> {
        if let Lookup::Found(_) = self.store.peek(&id).await? {
            tracing::warn!(id = %id, "Rejected submission under an id with a pending completion");
            return Err(GatewayError::IdInUse { id });
        }
        self.publish(Envelope::new(id, msg)).await
    }

    async fn publish(&self, envelope: Envelope) -> Result<Envelope, GatewayError> {
        if let Err(source) = self.bus.publish_task(&envelope).await {
            tracing::error!(id = %envelope.id, error = %source, "Failed to publish task");
            metrics::record_publish_failure(&self.bus.topics().task_topic);
            return Err(GatewayError::Publish {
                id: envelope.id,
                source,
            });
        }

        tracing::info!(id = %envelope.id, kind = envelope.msg.kind(), "Task submitted");
        metrics::record_submission(envelope.msg.kind());
        Ok(envelope)
    }

    /// Consume the completion for `id`. `Ok(None)` means it has not arrived yet.
    pub async fn retrieve(&self, id: &CorrelationId) -> Result<Option<Envelope>, GatewayError> {
        match self.store.take(id).await {
            Ok(Lookup::Found(envelope)) => {
                tracing::debug!(id = %id, status = envelope.status.as_str(), "Completion retrieved");
                metrics::record_retrieval("found");
                Ok(Some(envelope))
            }
            Ok(Lookup::NotFound) => {
                metrics::record_retrieval("pending");
                Ok(None)
            }
            Err(e) => {
                metrics::record_retrieval("error");
                Err(e.into())
            }
        }
    }

    /// Start listening for completion announcements. Take this before publishing.
    pub fn watch(&self) -> CompletionWatch {
        self.notifier.watch()
    }

    /// Block until the completion for `id` is available or `timeout` elapses.
    ///
    /// `None` waits without a deadline.
    pub async fn wait_for(
        &self,
        id: &CorrelationId,
        mut watch: CompletionWatch,
        timeout: Option<Duration>,
    ) -> Result<Envelope, GatewayError> {
        let started = Instant::now();
        let poll = self.poll_until_found(id, &mut watch);

        let outcome = match timeout {
            Some(limit) => match time::timeout(limit, poll).await {
                Ok(result) => result,
                Err(_) => Err(GatewayError::Timeout {
                    id: id.clone(),
                    waited: limit,
                }),
            },
            None => poll.await,
        };

        let label = match &outcome {
            Ok(_) => "completed",
            Err(GatewayError::Timeout { .. }) => {
                tracing::warn!(id = %id, waited = ?started.elapsed(), "Wait timed out");
                "timeout"
            }
            Err(_) => "error",
        };
        metrics::record_wait(label, started);
        outcome
    }

    /// Submit and wait in one call.
    pub async fn submit_and_wait(
        &self,
        msg: Payload,
        timeout: Option<Duration>,
    ) -> Result<Envelope, GatewayError> {
        let watch = self.watch();
        let ticket = self.submit(msg).await?;
        self.wait_for(&ticket.id, watch, timeout).await
    }

    /// Configured wait budget for transports that hold the connection.
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.config.wait_timeout_ms)
    }

    /// Frames a held WebSocket connection may queue behind its current wait.
    pub fn max_queued_frames(&self) -> usize {
        self.config.max_queued_frames
    }

    /// Calls currently waiting on a completion.
    pub fn waiting(&self) -> usize {
        self.notifier.watcher_count()
    }

    async fn poll_until_found(
        &self,
        id: &CorrelationId,
        watch: &mut CompletionWatch,
    ) -> Result<Envelope, GatewayError> {
        let mut backoff = Backoff::new(
            Duration::from_millis(self.config.poll_base_delay_ms),
            Duration::from_millis(self.config.poll_max_delay_ms),
        );

        loop {
            match self.store.take(id).await {
                Ok(Lookup::Found(envelope)) => return Ok(envelope),
                Ok(Lookup::NotFound) => {}
                Err(e) => match GatewayError::from(e) {
                    GatewayError::Store(e) => {
                        tracing::warn!(id = %id, error = %e, "Store lookup failed during wait; treating as not ready");
                    }
                    fatal => return Err(fatal),
                },
            }

            let delay = backoff.next_delay();
            tokio::select! {
                _ = time::sleep(delay) => {}
                _ = watch.announced(id) => {}
            }
        }
    }
}
