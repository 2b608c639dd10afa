//! Worker pool
//!
//! Bounded pool of long-lived workers, all running the same handler.
//! Submissions wait for a queue slot only as long as their context allows,
//! and every task runs under its own deadline.
//!
//! ```rust
//! use std::time::Duration;
//! use workpool::{Context, Pool, PoolError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), PoolError> {
//!     let mut pool = Pool::new();
//!     pool.handle_work(8, 2, Duration::from_secs(2), |ctx: Context, line: String| async move {
//!         if ctx.is_live() {
//!             println!("{line}");
//!         }
//!     })?;
//!     let _stopped = pool.run()?;
//!
//!     let ctx = Context::background().with_timeout(Duration::from_millis(100));
//!     pool.process(&ctx, "hello worker pool".to_owned()).await?;
//!     pool.stop();
//!     Ok(())
//! }
//! ```

/// Errors for the worker pool
mod errors;
pub use errors::{ContextError, PoolError};

/// Deadline-bearing cancellation token
mod context;
pub use context::Context;

/// Pool sizing
mod config;
pub use config::PoolConfig;

/// Admission queue, with backpressure
mod queue;

/// Worker loop
mod worker;
pub use worker::{Handler, HandlerFuture, WorkerState};

/// Worker pool, queue of payloads consumed by a fixed set of workers
mod pool;
pub use pool::Pool;
