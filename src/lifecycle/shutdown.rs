//! Shutdown coordination.

use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Coordinator for graceful shutdown.
///
/// Long-running tasks subscribe to the broadcast and are registered with
/// [`track`](Self::track); [`drain`](Self::drain) fires the signal and waits for
/// them, up to a deadline.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    tasks: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// The sender, for components that subscribe several receivers themselves.
    pub fn sender(&self) -> &broadcast::Sender<()> {
        &self.tx
    }

    /// Register a background task to be awaited on drain.
    pub fn track(&self, name: &'static str, handle: JoinHandle<()>) {
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.push((name, handle));
        }
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Trigger shutdown and wait for tracked tasks. Tasks still running at the
    /// deadline are aborted. Returns how many finished on their own.
    pub async fn drain(&self, grace: Duration) -> usize {
        self.trigger();

        let tasks = match self.tasks.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(_) => return 0,
        };
        let deadline = tokio::time::Instant::now() + grace;

        let mut finished = 0;
        for (name, mut handle) in tasks {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => finished += 1,
                Ok(Err(e)) => tracing::error!(task = name, error = %e, "Task ended abnormally"),
                Err(_) => {
                    tracing::warn!(task = name, "Task did not stop before the grace period; aborting");
                    handle.abort();
                }
            }
        }
        finished
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
