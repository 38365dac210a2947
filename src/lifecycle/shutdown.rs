//! Shutdown coordination.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Broadcasts one shutdown signal to every long-running task and bounds how
/// long the server may take to drain.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    grace: Duration,
}

impl Shutdown {
    pub fn new(grace: Duration) -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx, grace }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        tracing::info!(
            subscribers = self.tx.receiver_count(),
            grace_secs = self.grace.as_secs(),
            "Shutdown triggered"
        );
        let _ = self.tx.send(());
    }

    /// Wait for `task` to finish. Aborts it once the grace period runs out.
    ///
    /// Returns `None` if the task was aborted or panicked.
    pub async fn drain<T>(&self, mut task: JoinHandle<T>) -> Option<T> {
        match tokio::time::timeout(self.grace, &mut task).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Task failed while draining");
                None
            }
            Err(_) => {
                tracing::warn!(grace_secs = self.grace.as_secs(), "Drain deadline passed, aborting");
                task.abort();
                None
            }
        }
    }
}
