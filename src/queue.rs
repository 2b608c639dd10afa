use std::sync::atomic::{AtomicUsize, Ordering};

use async_channel::{Receiver, Sender};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::{Context, PoolError};

/// A payload waiting in the queue, with the context it was submitted under
#[derive(Debug)]
pub(crate) struct Envelope<T> {
    pub(crate) payload: T,
    pub(crate) submission: Context,
}

/// Fixed capacity FIFO shared between submitters and workers.
///
/// Admission is gated by a semaphore holding one permit per place an envelope
/// may go: the free buffer slots, plus one per worker currently waiting in
/// [`BoundedQueue::dequeue`]. A zero capacity queue therefore only admits when
/// a worker is ready to take the envelope right away, with no special case.
///
/// Envelopes themselves travel through an unbounded channel, the semaphore is
/// what bounds it. Its receiver is shared without a lock, so a worker
/// waiting for work never holds up the others.
///
/// Permits never exceed `capacity + workers`, which [`crate::PoolConfig`]
/// keeps within [`Semaphore::MAX_PERMITS`].
pub(crate) struct BoundedQueue<T> {
    /// Admission permits, closed on shutdown
    slots: Semaphore,
    /// Producer side of the envelope channel
    tx: Sender<Envelope<T>>,
    /// Consumer side, polled concurrently by every worker
    rx: Receiver<Envelope<T>>,
    /// Envelopes admitted but not claimed yet
    pending: AtomicUsize,
    /// Number of envelopes the queue may buffer
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Create a new `Self`
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, rx) = async_channel::unbounded();

        Self {
            slots: Semaphore::new(capacity),
            tx,
            rx,
            pending: AtomicUsize::new(0),
            capacity,
        }
    }

    /// Number of envelopes the queue may buffer
    pub(crate) const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Envelopes admitted but not yet claimed by a worker
    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Place an envelope in the queue.
    ///
    /// Waits for a free slot for as long as the submission context is live.
    /// A free slot always wins over a dead context.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Backpressure`] if the submission context died
    /// before a slot freed, [`PoolError::Stopped`] if the queue is closed.
    pub(crate) async fn enqueue(&self, envelope: Envelope<T>) -> Result<(), PoolError> {
        let permit = tokio::select! {
            biased;
            permit = self.slots.acquire() => permit.map_err(|_| PoolError::Stopped)?,
            cause = envelope.submission.done() => return Err(PoolError::Backpressure(cause)),
        };
        // The slot is given back by a worker, not by dropping the permit
        permit.forget();

        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.try_send(envelope).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(PoolError::Stopped);
        }

        Ok(())
    }

    /// Wait for the next envelope, or `None` once `shutdown` is cancelled.
    ///
    /// Every call announces the readiness of the worker by adding one
    /// admission slot, consumed back by the envelope it ends up claiming.
    pub(crate) async fn dequeue(&self, shutdown: &CancellationToken) -> Option<Envelope<T>> {
        self.slots.add_permits(1);

        let envelope = tokio::select! {
            biased;
            () = shutdown.cancelled() => None,
            envelope = self.rx.recv() => envelope.ok(),
        }?;

        self.pending.fetch_sub(1, Ordering::SeqCst);
        Some(envelope)
    }

    /// Refuse any further admission, waking blocked submitters
    pub(crate) fn close(&self) {
        self.slots.close();
    }
}
