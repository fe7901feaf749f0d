//! Global fetch concurrency budget
//!
//! One budget is shared by every worker. Each page fetch holds a permit for
//! its whole duration; the permit is returned when it is dropped, on every
//! exit path including errors, timeouts and cancellation.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting bound on in-flight page fetches across all workers
#[derive(Debug)]
pub struct FetchBudget {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// One slot of the fetch budget, released on drop
#[derive(Debug)]
pub struct FetchPermit {
    _permit: OwnedSemaphorePermit,
}

impl FetchBudget {
    /// Creates a budget allowing `capacity` simultaneous fetches
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Waits for a free slot
    ///
    /// Returns `None` only if the budget has been closed.
    pub async fn acquire(&self) -> Option<FetchPermit> {
        let permit = self.semaphore.clone().acquire_owned().await.ok()?;
        Some(FetchPermit { _permit: permit })
    }

    /// Stops handing out new slots; pending and future `acquire` calls return `None`
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Slots currently held by fetches
    pub fn in_flight(&self) -> usize {
        self.capacity.saturating_sub(self.available())
    }
}
