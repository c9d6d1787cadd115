//! Startup orchestration.
//!
//! Builds the bus and store once and injects them into every component, then
//! starts background tasks in dependency order:
//!
//! ```text
//! bus, store, notifier
//!     → completion relay   (subscribe failure is fatal)
//!     → worker pool        (subscribe failure is fatal)
//!     → TTL sweeper        (only when records expire)
//!     → Gateway handed to the transports
//! ```

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::bus::{BusError, MemoryBus, MessageBus, TaskBus};
use crate::config::TaskgateConfig;
use crate::gateway::{CompletionNotifier, Gateway};
use crate::lifecycle::Shutdown;
use crate::relay::CompletionRelay;
use crate::store::{CorrelationStore, KeyValueStore, MemoryStore, TtlSweeper};
use crate::worker::{Processor, TaskProcessor, WorkerPool};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("completion relay could not subscribe: {0}")]
    Relay(#[source] BusError),

    #[error("worker pool could not subscribe: {0}")]
    Workers(#[source] BusError),

    #[error("failed to build task processor: {0}")]
    Processor(#[from] reqwest::Error),
}

/// The running core: relay, workers and sweeper, plus the gateway that fronts them.
pub struct Runtime {
    gateway: Gateway,
    shutdown: Shutdown,
    grace: Duration,
}

impl Runtime {
    /// Start with the in-process bus and store.
    pub async fn start(config: &TaskgateConfig) -> Result<Self, StartupError> {
        let ttl = (config.store.ttl_secs > 0).then(|| Duration::from_secs(config.store.ttl_secs));
        let processor = TaskProcessor::new(&config.worker)?;
        Self::start_with(
            config,
            Arc::new(MemoryBus::new()),
            Arc::new(MemoryStore::new(ttl)),
            Arc::new(processor),
        )
        .await
    }

    /// Start against the given infrastructure and work operation.
    pub async fn start_with(
        config: &TaskgateConfig,
        bus: Arc<dyn MessageBus>,
        kv: Arc<dyn KeyValueStore>,
        processor: Arc<dyn Processor>,
    ) -> Result<Self, StartupError> {
        let shutdown = Shutdown::new();
        let task_bus = TaskBus::new(bus, config.bus.clone());
        let store = CorrelationStore::new(kv);
        let notifier = CompletionNotifier::new();

        let relay = CompletionRelay::spawn(&task_bus, store.clone(), notifier.clone(), shutdown.subscribe())
            .await
            .map_err(StartupError::Relay)?;
        shutdown.track("completion-relay", relay);

        let workers = WorkerPool::new(task_bus.clone(), processor, config.worker.clone())
            .spawn(shutdown.sender())
            .await
            .map_err(StartupError::Workers)?;
        for handle in workers {
            shutdown.track("worker", handle);
        }

        if config.store.ttl_secs > 0 {
            let sweeper = TtlSweeper::new(store.clone(), Duration::from_secs(config.store.sweep_interval_secs));
            shutdown.track("ttl-sweeper", tokio::spawn(sweeper.run(shutdown.subscribe())));
        }

        let gateway = Gateway::new(task_bus, store, notifier, config.gateway.clone());
        tracing::info!(
            task_topic = %config.bus.task_topic,
            completion_topic = %config.bus.completion_topic,
            workers = config.worker.instances,
            "Core started"
        );

        Ok(Self {
            gateway,
            shutdown,
            grace: Duration::from_secs(config.timeouts.shutdown_grace_secs),
        })
    }

    pub fn gateway(&self) -> Gateway {
        self.gateway.clone()
    }

    /// Signal every background task and wait for them to finish.
    pub async fn stop(self) {
        let finished = self.shutdown.drain(self.grace).await;
        tracing::info!(finished, "Core stopped");
    }
}
