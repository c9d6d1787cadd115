//! Push notification of recorded completions.
//!
//! The relay announces every id it has written to the store; a waiting gateway call
//! wakes as soon as its own id goes by instead of sleeping out a poll interval.
//! Notifications are hints: the waiter always re-reads the store, so a missed or
//! lagged notification only costs a poll.

use tokio::sync::broadcast::{self, error::RecvError};

use crate::envelope::CorrelationId;

/// Slots in the broadcast ring before slow watchers start lagging.
const CHANNEL_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct CompletionNotifier {
    tx: broadcast::Sender<CorrelationId>,
}

impl CompletionNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Announce that the completion for `id` is now in the store.
    pub fn notify(&self, id: &CorrelationId) {
        // No receivers just means nobody is waiting.
        let _ = self.tx.send(id.clone());
    }

    /// Start watching. Must happen before the task is published.
    pub fn watch(&self) -> CompletionWatch {
        CompletionWatch {
            rx: self.tx.subscribe(),
        }
    }

    pub fn watcher_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for CompletionNotifier {
    fn default() -> Self {
        Self::new()
    }
}

pub struct CompletionWatch {
    rx: broadcast::Receiver<CorrelationId>,
}

impl CompletionWatch {
    /// Resolve when `id` is announced, or when announcements may have been missed.
    ///
    /// Never resolves once the notifier is gone; callers race this against a poll
    /// delay.
    pub async fn announced(&mut self, id: &CorrelationId) {
        loop {
            match self.rx.recv().await {
                Ok(done) if &done == id => return,
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(id = %id, skipped, "Completion watch lagged");
                    return;
                }
                Err(RecvError::Closed) => std::future::pending::<()>().await,
            }
        }
    }
}
