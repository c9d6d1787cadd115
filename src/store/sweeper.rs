//! Periodic reclamation of expired completion records.
//!
//! Completions nobody retrieves (client gone, ticket lost) would otherwise live in
//! the store forever.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::observability::metrics;
use crate::store::CorrelationStore;

pub struct TtlSweeper {
    store: CorrelationStore,
    interval: Duration,
}

impl TtlSweeper {
    pub fn new(store: CorrelationStore, interval: Duration) -> Self {
        Self { store, interval }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval = ?self.interval, "TTL sweeper starting");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.sweep_once().await,
                _ = shutdown.recv() => {
                    tracing::info!("TTL sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    async fn sweep_once(&self) {
        match self.store.purge_expired().await {
            Ok(0) => {}
            Ok(removed) => {
                tracing::info!(removed, "Purged expired completion records");
                metrics::record_expired(removed);
            }
            Err(e) => tracing::warn!(error = %e, "Sweep failed; will retry next tick"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{CorrelationId, Envelope, Payload};
    use crate::store::{Lookup, MemoryStore};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_sweeper_purges_orphans() {
        let kv = MemoryStore::new(Some(Duration::from_millis(10)));
        let store = CorrelationStore::new(Arc::new(kv.clone()));
        let env = Envelope::new(CorrelationId::generate(), Payload::Raw(json!(1))).complete(json!(1));
        store.record(&env).await.unwrap();

        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(TtlSweeper::new(store.clone(), Duration::from_millis(20)).run(rx));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(kv.is_empty());
        assert_eq!(store.peek(&env.id).await.unwrap(), Lookup::NotFound);

        tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
