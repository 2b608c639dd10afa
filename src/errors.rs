/// Reason a [`Context`](crate::Context) stopped being live
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    /// The context, or one of its ancestors, was cancelled
    #[error("context cancelled")]
    Cancelled,

    /// The nearest deadline of the context has elapsed
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Worker pool errors
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// The queue stayed full until the submission context died, the task has
    /// been discarded
    #[error("failed to schedule task in pool: backpressure")]
    Backpressure(#[source] ContextError),

    /// The pool has been stopped and no longer admits tasks
    #[error("failed to schedule task in pool: pool stopped")]
    Stopped,

    /// Tasks were submitted before the pool was started
    #[error("failed to schedule task in pool: pool not running")]
    NotRunning,

    /// `handle_work` was called on a pool already configured
    #[error("pool is already configured")]
    AlreadyConfigured,

    /// `run` was called before any handler was registered
    #[error("pool has no handler configured")]
    NotConfigured,

    /// `run` was called twice
    #[error("pool is already running")]
    AlreadyRunning,

    /// Queue capacity and worker count need more admission slots than a
    /// semaphore can hold
    #[error("invalid queue capacity: too many admission slots")]
    InvalidQueueCapacity,

    /// A pool needs at least one worker
    #[error("invalid worker count: a pool needs at least one worker")]
    InvalidWorkerCount,
}
