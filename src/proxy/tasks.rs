//! Detached background work.
//!
//! Store writes and deletes are decoupled from the request/response cycle:
//! the response may reach the client before the work is durable. Failures
//! are still logged here instead of disappearing into an unobserved future.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Runner for fire-and-forget units of work.
///
/// Cloneable and cheap; all clones share the same in-flight counter so
/// `quiesce` (tests, shutdown) can wait for every scheduled task.
#[derive(Clone)]
pub struct DetachedTasks {
    in_flight: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl DetachedTasks {
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(Notify::new()),
        }
    }

    /// Schedule a unit of work whose completion the request path never
    /// awaits. An `Err` outcome is logged under the given label.
    pub fn spawn<F, E>(&self, label: &'static str, work: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: std::fmt::Display,
    {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.in_flight.clone();
        let idle = self.idle.clone();

        tokio::spawn(async move {
            match work.await {
                Ok(()) => tracing::debug!("detached task '{}' completed", label),
                Err(e) => tracing::warn!("detached task '{}' failed: {}", label, e),
            }
            if in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
                idle.notify_waiters();
            }
        });
    }

    /// Wait until every scheduled task has finished. The request path never
    /// calls this; it exists for shutdown and tests.
    pub async fn quiesce(&self) {
        loop {
            let notified = self.idle.notified();
            if self.in_flight.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Default for DetachedTasks {
    fn default() -> Self {
        Self::new()
    }
}
