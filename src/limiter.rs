//! Admission gate bounding how many sandboxed executions run at once.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Process-wide counting gate. Acquisition is FIFO: callers that arrive
/// at capacity queue in arrival order and are released in that order.
#[derive(Debug, Clone)]
pub struct Limiter {
    semaphore: Arc<Semaphore>,
}

/// A held execution slot. Dropping it returns the slot to the gate,
/// which makes release unconditional on every exit path.
#[derive(Debug)]
pub struct Permit {
    _inner: OwnedSemaphorePermit,
}

impl Limiter {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
        }
    }

    /// Wait for an execution slot. Suspends while capacity is exhausted.
    pub async fn acquire(&self) -> Permit {
        // The semaphore is never closed, so acquisition cannot fail.
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .expect("limiter semaphore closed");
        Permit { _inner: permit }
    }

    #[cfg(test)]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}
