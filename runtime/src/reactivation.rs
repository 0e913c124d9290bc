//! Periodic background sweep returning expired leases to the active order.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::lease::LeaseQueue;

/// Anything the timer can sweep.
pub trait Reactivate: Send + Sync + 'static {
    fn queue_name(&self) -> &'static str;
    /// Requeue every expired lease; returns how many items moved.
    fn reactivate_expired(&self) -> usize;
}

impl<T: Clone + Send + 'static> Reactivate for LeaseQueue<T> {
    fn queue_name(&self) -> &'static str {
        self.name()
    }

    fn reactivate_expired(&self) -> usize {
        LeaseQueue::reactivate_expired(self)
    }
}

/// Cancellable sweep task owned by a dispatcher. Dropping the timer stops the
/// loop at its next iteration.
pub struct ReactivationTimer {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ReactivationTimer {
    pub fn spawn(target: Arc<dyn Reactivate>, interval: Duration) -> Self {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_sweep_loop(target, interval, cancel.clone()));
        Self {
            cancel,
            task: Some(task),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Signal the loop and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::error!(error = %err, "reactivation sweep task failed");
            }
        }
    }
}

impl Drop for ReactivationTimer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_sweep_loop(target: Arc<dyn Reactivate>, period: Duration, cancel: CancellationToken) {
    let queue = target.queue_name();
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::debug!(queue, period_ms = period.as_millis() as u64, "reactivation sweep started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(queue, "reactivation sweep stopped");
                break;
            }
            _ = ticker.tick() => {
                let moved = target.reactivate_expired();
                if moved > 0 {
                    tracing::info!(queue, reactivated = moved, "reactivation sweep requeued items");
                }
            }
        }
    }
}
