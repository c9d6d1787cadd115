//! Worker instances and the pool that runs them.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};

use crate::bus::{BusError, EnvelopeStream, TaskBus};
use crate::config::WorkerConfig;
use crate::envelope::{Envelope, Status};
use crate::observability::metrics;
use crate::worker::processor::Processor;

/// One member of the worker consumer group.
pub struct Worker {
    index: usize,
    tasks: EnvelopeStream,
    bus: TaskBus,
    processor: Arc<dyn Processor>,
    in_flight: Arc<Semaphore>,
}

impl Worker {
    /// Join the consumer group on the task topic.
    pub async fn connect(
        index: usize,
        bus: TaskBus,
        processor: Arc<dyn Processor>,
        max_in_flight: usize,
    ) -> Result<Self, BusError> {
        let tasks = bus.subscribe_tasks().await?;
        tracing::info!(worker = index, topic = %tasks.topic(), group = %bus.topics().worker_group, "Worker subscribed");
        Ok(Self {
            index,
            tasks,
            bus,
            processor,
            in_flight: Arc::new(Semaphore::new(max_in_flight)),
        })
    }

    /// Consume until shutdown, then finish whatever is in flight.
    ///
    /// A delivery is only taken once a slot is free, so a saturated worker leaves
    /// new tasks to the rest of the group and still hears shutdown.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        let mut running = JoinSet::new();

        loop {
            let permit = tokio::select! {
                permit = self.in_flight.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                Some(joined) = running.join_next(), if !running.is_empty() => {
                    self.reap(joined);
                    continue;
                }
                _ = shutdown.recv() => {
                    tracing::info!(worker = self.index, in_flight = running.len(), "Worker received shutdown signal, draining");
                    break;
                }
            };

            tokio::select! {
                delivery = self.tasks.next() => match delivery {
                    Some(Ok(envelope)) => {
                        let bus = self.bus.clone();
                        let processor = self.processor.clone();
                        let index = self.index;
                        running.spawn(async move {
                            handle_task(index, envelope, &bus, processor.as_ref()).await;
                            drop(permit);
                        });
                    }
                    Some(Err(e)) => {
                        tracing::warn!(worker = self.index, error = %e, "Dropping undecodable task");
                        metrics::record_decode_failure(self.tasks.topic());
                    }
                    None => {
                        tracing::warn!(worker = self.index, "Task subscription closed by broker");
                        break;
                    }
                },
                Some(joined) = running.join_next(), if !running.is_empty() => self.reap(joined),
                _ = shutdown.recv() => {
                    tracing::info!(worker = self.index, in_flight = running.len(), "Worker received shutdown signal, draining");
                    break;
                }
            }
        }

        while let Some(joined) = running.join_next().await {
            self.reap(joined);
        }
        tracing::info!(worker = self.index, "Worker stopped");
    }

    fn reap(&self, joined: Result<(), JoinError>) {
        if let Err(e) = joined {
            tracing::error!(worker = self.index, error = %e, "Task handler panicked");
        }
    }
}

/// Process one delivery and publish its completion.
pub async fn handle_task(worker: usize, envelope: Envelope, bus: &TaskBus, processor: &dyn Processor) {
    if envelope.status != Status::Processing {
        tracing::warn!(worker, id = %envelope.id, status = envelope.status.as_str(), "Dropping task that is not pending");
        return;
    }

    let started = Instant::now();
    let kind = envelope.msg.kind();
    tracing::info!(worker, id = %envelope.id, kind, "Processing task");

    let completion = match processor.process(envelope.msg.clone()).await {
        Ok(result) => {
            metrics::record_task_processed("done", started);
            envelope.complete(result)
        }
        Err(e) => {
            tracing::warn!(worker, id = %envelope.id, kind, error = %e, "Task failed");
            metrics::record_task_processed("failed", started);
            envelope.fail(e.to_string())
        }
    };

    match bus.publish_completion(&completion).await {
        Ok(()) => tracing::info!(
            worker,
            id = %completion.id,
            status = completion.status.as_str(),
            elapsed = ?started.elapsed(),
            "Task completed"
        ),
        // Not retried; a waiter for this id runs into its timeout.
        Err(e) => {
            tracing::error!(worker, id = %completion.id, error = %e, "Failed to publish completion");
            metrics::record_publish_failure(&bus.topics().completion_topic);
        }
    }
}

/// Independent workers sharing one consumer group.
pub struct WorkerPool {
    bus: TaskBus,
    processor: Arc<dyn Processor>,
    config: WorkerConfig,
}

impl WorkerPool {
    pub fn new(bus: TaskBus, processor: Arc<dyn Processor>, config: WorkerConfig) -> Self {
        Self {
            bus,
            processor,
            config,
        }
    }

    /// Subscribe every instance, then run each on its own task.
    ///
    /// Fails if any instance cannot subscribe; nothing is spawned in that case.
    pub async fn spawn(self, shutdown: &broadcast::Sender<()>) -> Result<Vec<JoinHandle<()>>, BusError> {
        let mut workers = Vec::with_capacity(self.config.instances);
        for index in 0..self.config.instances {
            workers.push(
                Worker::connect(index, self.bus.clone(), self.processor.clone(), self.config.max_in_flight)
                    .await?,
            );
        }

        tracing::info!(instances = workers.len(), max_in_flight = self.config.max_in_flight, "Worker pool started");
        Ok(workers
            .into_iter()
            .map(|worker| tokio::spawn(worker.run(shutdown.subscribe())))
            .collect())
    }
}
