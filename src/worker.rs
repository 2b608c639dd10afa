use std::{
    future::Future,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
    time::Duration,
};

use crate::{Context, queue::BoundedQueue};

/// Future returned by a [`Handler`]
pub type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Task handler shared by every worker of a pool
pub type Handler<T> = Arc<dyn Fn(Context, T) -> HandlerFuture + Send + Sync>;

/// Lifecycle of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Waiting for a task
    Idle,
    /// Running the handler
    Executing,
    /// Exited after the pool shutdown signal
    Stopped,
}

impl WorkerState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Idle,
            1 => Self::Executing,
            _ => Self::Stopped,
        }
    }

    const fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Executing => 1,
            Self::Stopped => 2,
        }
    }
}

/// Worker state readable from the pool while the worker runs
#[derive(Debug, Clone)]
pub(crate) struct StateCell(Arc<AtomicU8>);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(Arc::new(AtomicU8::new(WorkerState::Idle.as_u8())))
    }

    pub(crate) fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::SeqCst))
    }

    fn set(&self, state: WorkerState) {
        self.0.store(state.as_u8(), Ordering::SeqCst);
    }
}

/// Long-lived consumer of the pool queue
pub(crate) struct Worker<T> {
    pub(crate) id: usize,
    pub(crate) queue: Arc<BoundedQueue<T>>,
    pub(crate) handler: Handler<T>,
    pub(crate) task_timeout: Duration,
    /// Pool lifetime context, every task context derives from it
    pub(crate) lifetime: Context,
    pub(crate) state: StateCell,
}

impl<T: Send + 'static> Worker<T> {
    /// Consume the queue until the pool lifetime context is cancelled.
    ///
    /// Each task gets a fresh context expiring `task_timeout` after it was
    /// claimed, whatever the submission context says. The handler is never
    /// interrupted: an overrunning task keeps the worker busy until it returns.
    pub(crate) async fn run(self) {
        tracing::debug!(worker = self.id, "worker started");
        let shutdown = self.lifetime.token();

        loop {
            self.state.set(WorkerState::Idle);
            let Some(envelope) = self.queue.dequeue(&shutdown).await else {
                break;
            };
            self.state.set(WorkerState::Executing);

            if let Some(cause) = envelope.submission.err() {
                // Admission already happened, the task runs anyway
                tracing::debug!(
                    worker = self.id,
                    "claimed task after its submission context ended: {cause}"
                );
            }

            let ctx = self.lifetime.with_timeout(self.task_timeout);
            let job = tokio::spawn((self.handler)(ctx, envelope.payload));
            if let Err(err) = job.await {
                tracing::warn!(worker = self.id, "issue occured while running task: {err}");
            }
        }

        self.state.set(WorkerState::Stopped);
        tracing::debug!(worker = self.id, "worker stopped");
    }
}
