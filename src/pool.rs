use std::{future::Future, sync::Arc, time::Duration};

use tokio::sync::oneshot;

use crate::{
    Context, PoolConfig, PoolError,
    queue::{BoundedQueue, Envelope},
    worker::{Handler, HandlerFuture, StateCell, Worker, WorkerState},
};

/// Configuration and handler registered before the pool runs
struct Settings<T> {
    config: PoolConfig,
    handler: Handler<T>,
}

/// Shared state of a started pool
struct Running<T> {
    queue: Arc<BoundedQueue<T>>,
    states: Vec<StateCell>,
}

/// Bounded pool of long-lived workers running a single handler.
///
/// Lifecycle is `new` → `handle_work` → `run` → `process`... → `stop`.
/// Configuration and start take `&mut self`, everything after takes `&self`:
/// wrap the running pool in an `Arc` to share it between submitters.
///
/// Stopping does not drain the queue: in-flight tasks finish, envelopes not
/// claimed yet are dropped, and submissions fail with [`PoolError::Stopped`].
/// Dropping the pool stops it.
pub struct Pool<T> {
    settings: Option<Settings<T>>,
    running: Option<Running<T>>,
    /// Cancelled on stop, parent of every task context
    lifetime: Context,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Pool<T> {
    /// Create an unconfigured, unstarted pool
    #[must_use]
    pub fn new() -> Self {
        Self {
            settings: None,
            running: None,
            lifetime: Context::background(),
        }
    }

    /// Get the configuration, once registered
    #[must_use]
    pub fn config(&self) -> Option<&PoolConfig> {
        self.settings.as_ref().map(|settings| &settings.config)
    }

    /// Whether `run` succeeded and `stop` has not been called yet
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.is_some() && self.lifetime.is_live()
    }

    /// Number of admitted tasks not claimed by a worker yet
    #[must_use]
    pub fn pending(&self) -> usize {
        self.running
            .as_ref()
            .map_or(0, |running| running.queue.pending())
    }

    /// Current state of each worker, empty before `run`
    #[must_use]
    pub fn worker_states(&self) -> Vec<WorkerState> {
        self.running.as_ref().map_or_else(Vec::new, |running| {
            running.states.iter().map(StateCell::get).collect()
        })
    }

    /// Signal every worker to exit once its current task returns, and refuse
    /// any further submission. Queued tasks are not run.
    /// Stopping twice is a no-op.
    pub fn stop(&self) {
        if !self.lifetime.is_live() {
            return;
        }

        self.lifetime.cancel();
        if let Some(running) = &self.running {
            running.queue.close();
            tracing::info!(dropped = running.queue.pending(), "worker pool stopped");
        }
    }
}

impl<T: Send + 'static> Pool<T> {
    /// Register the handler and size the pool.
    ///
    /// The handler receives a context expiring `task_timeout` after the task
    /// was claimed, unrelated to the context it was submitted with. Nothing
    /// interrupts a handler running past its deadline: long handlers should
    /// check [`Context::is_live`] or race their work against
    /// [`Context::done`], otherwise they keep their worker busy. A panicking
    /// handler is logged and its worker moves on to the next task.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::AlreadyConfigured`] if a handler is already
    /// registered, [`PoolError::InvalidWorkerCount`] if `workers` is zero,
    /// [`PoolError::InvalidQueueCapacity`] if `queue_capacity` is too large.
    pub fn handle_work<F, Fut>(
        &mut self,
        queue_capacity: usize,
        workers: usize,
        task_timeout: Duration,
        handler: F,
    ) -> Result<(), PoolError>
    where
        F: Fn(Context, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.settings.is_some() {
            return Err(PoolError::AlreadyConfigured);
        }

        let config = PoolConfig::new(queue_capacity, workers, task_timeout)?;
        self.configure(config, handler)
    }

    /// Register the handler with an already validated configuration.
    /// See [`Pool::handle_work`].
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::AlreadyConfigured`] if a handler is already
    /// registered.
    pub fn configure<F, Fut>(&mut self, config: PoolConfig, handler: F) -> Result<(), PoolError>
    where
        F: Fn(Context, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.settings.is_some() {
            return Err(PoolError::AlreadyConfigured);
        }

        let handler: Handler<T> = Arc::new(move |ctx: Context, payload: T| -> HandlerFuture {
            Box::pin(handler(ctx, payload))
        });
        self.settings = Some(Settings { config, handler });

        Ok(())
    }

    /// Launch the workers and return without waiting for them to be ready.
    /// Tasks submitted meanwhile simply wait for a slot.
    ///
    /// Must be called from within a tokio runtime. The returned receiver
    /// completes once every worker has exited after [`Pool::stop`].
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::NotConfigured`] without a handler,
    /// [`PoolError::AlreadyRunning`] on a second call, [`PoolError::Stopped`]
    /// if the pool was stopped before being started.
    pub fn run(&mut self) -> Result<oneshot::Receiver<()>, PoolError> {
        if self.running.is_some() {
            return Err(PoolError::AlreadyRunning);
        }
        if !self.lifetime.is_live() {
            return Err(PoolError::Stopped);
        }
        let Some(settings) = &self.settings else {
            return Err(PoolError::NotConfigured);
        };

        let config = settings.config;
        let queue = Arc::new(BoundedQueue::new(config.queue_capacity()));
        let mut states = Vec::with_capacity(config.workers());
        let mut handles = Vec::with_capacity(config.workers());

        for id in 0..config.workers() {
            let state = StateCell::new();
            let worker = Worker {
                id,
                queue: Arc::clone(&queue),
                handler: Arc::clone(&settings.handler),
                task_timeout: config.task_timeout(),
                lifetime: self.lifetime.clone(),
                state: state.clone(),
            };
            handles.push(tokio::spawn(worker.run()));
            states.push(state);
        }

        // Report when every worker has exited
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            for handle in handles {
                if let Err(err) = handle.await {
                    tracing::warn!("issue occured while waiting for worker: {err}");
                }
            }

            if let Err(()) = stop_tx.send(()) {
                tracing::debug!("nobody is waiting for the worker pool to stop");
            }
        });

        tracing::info!(
            workers = config.workers(),
            queue_capacity = queue.capacity(),
            task_timeout = ?config.task_timeout(),
            "worker pool started"
        );
        self.running = Some(Running { queue, states });

        Ok(stop_rx)
    }

    /// Submit a task.
    ///
    /// Returns as soon as the task is admitted in the queue, without waiting
    /// for it to run. When the queue is full, waits for a slot for as long as
    /// `ctx` is live. `ctx` only bounds this wait: once admitted, the task runs
    /// even if `ctx` dies.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Backpressure`] if `ctx` died before a slot freed,
    /// [`PoolError::NotRunning`] before `run`, [`PoolError::Stopped`] after
    /// `stop`.
    pub async fn process(&self, ctx: &Context, payload: T) -> Result<(), PoolError> {
        let Some(running) = &self.running else {
            return Err(PoolError::NotRunning);
        };
        if !self.lifetime.is_live() {
            return Err(PoolError::Stopped);
        }

        running
            .queue
            .enqueue(Envelope {
                payload,
                submission: ctx.clone(),
            })
            .await
    }
}

impl<T> Drop for Pool<T> {
    fn drop(&mut self) {
        self.stop();
    }
}
