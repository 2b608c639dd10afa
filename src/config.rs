use std::{num::NonZeroUsize, time::Duration};

use tokio::sync::Semaphore;

use crate::PoolError;

/// Sizing and timing of a worker pool, immutable once the pool runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Envelopes buffered while every worker is busy, 0 for a direct handoff
    queue_capacity: usize,
    /// Number of long-lived workers
    workers: NonZeroUsize,
    /// Lifetime of the context handed to each task
    task_timeout: Duration,
}

impl PoolConfig {
    /// Create a new `Self`
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidWorkerCount`] if `workers` is zero,
    /// [`PoolError::InvalidQueueCapacity`] if the queue capacity plus the
    /// workers exceed [`Semaphore::MAX_PERMITS`] admission slots.
    pub fn new(
        queue_capacity: usize,
        workers: usize,
        task_timeout: Duration,
    ) -> Result<Self, PoolError> {
        let workers = NonZeroUsize::new(workers).ok_or(PoolError::InvalidWorkerCount)?;
        // Each idle worker lends one admission slot on top of the buffer
        match queue_capacity.checked_add(workers.get()) {
            Some(slots) if slots <= Semaphore::MAX_PERMITS => {}
            _ => return Err(PoolError::InvalidQueueCapacity),
        }

        Ok(Self {
            queue_capacity,
            workers,
            task_timeout,
        })
    }

    /// Get the queue capacity of the pool
    #[must_use]
    pub const fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Get the number of workers of the pool
    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers.get()
    }

    /// Get the per-task timeout
    #[must_use]
    pub const fn task_timeout(&self) -> Duration {
        self.task_timeout
    }
}
