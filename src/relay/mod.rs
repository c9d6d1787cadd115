//! Completion relay.
//!
//! # Responsibilities
//! - Follow the completion topic for the lifetime of the process
//! - Write every completion into the correlation store, keyed by its id
//! - Tell in-process waiters their completion has landed
//!
//! # Design Decisions
//! - Unconditional overwrite: a redelivered completion rewrites the same value
//! - Undecodable deliveries are dropped; they can never become valid
//! - Envelopes still marked Processing are dropped; recording one would hand a
//!   waiter its own ticket back
//! - Subscribing happens before the loop is spawned, so a broker outage at startup
//!   fails startup instead of leaving a relay that never relays

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::bus::{BusError, EnvelopeStream, TaskBus};
use crate::gateway::CompletionNotifier;
use crate::observability::metrics;
use crate::store::CorrelationStore;

pub struct CompletionRelay {
    completions: EnvelopeStream,
    store: CorrelationStore,
    notifier: CompletionNotifier,
}

impl CompletionRelay {
    /// Subscribe to the completion topic.
    pub async fn connect(
        bus: &TaskBus,
        store: CorrelationStore,
        notifier: CompletionNotifier,
    ) -> Result<Self, BusError> {
        let completions = bus.subscribe_completions().await?;
        tracing::info!(topic = %completions.topic(), "Completion relay subscribed");
        Ok(Self {
            completions,
            store,
            notifier,
        })
    }

    /// Connect and run on a background task.
    pub async fn spawn(
        bus: &TaskBus,
        store: CorrelationStore,
        notifier: CompletionNotifier,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<JoinHandle<()>, BusError> {
        let relay = Self::connect(bus, store, notifier).await?;
        Ok(tokio::spawn(relay.run(shutdown)))
    }

    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                delivery = self.completions.next() => match delivery {
                    Some(Ok(envelope)) if !envelope.is_terminal() => {
                        tracing::warn!(id = %envelope.id, "Dropping completion that is still Processing");
                        metrics::record_completion("not_terminal");
                    }
                    Some(Ok(envelope)) => {
                        match self.store.record(&envelope).await {
                            Ok(()) => {
                                tracing::debug!(id = %envelope.id, status = envelope.status.as_str(), "Completion recorded");
                                metrics::record_completion("recorded");
                                self.notifier.notify(&envelope.id);
                            }
                            Err(e) => {
                                tracing::error!(id = %envelope.id, error = %e, "Failed to record completion");
                                metrics::record_completion("store_error");
                            }
                        }
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Dropping undecodable completion");
                        metrics::record_decode_failure(self.completions.topic());
                    }
                    None => {
                        tracing::warn!("Completion subscription closed by broker");
                        break;
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!("Completion relay received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
