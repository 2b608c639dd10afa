//! Deadline-bearing cancellation token.
//!
//! A [`Context`] pairs a [`CancellationToken`] with an optional deadline.
//! Derived contexts share their parent's cancellation (cancelling a parent
//! cancels every descendant, never the other way around) and may only tighten
//! the inherited deadline.
//!
//! Contexts are checked cooperatively: nothing is interrupted when a context
//! dies, holders are expected to poll [`Context::is_live`] or await
//! [`Context::done`].

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::ContextError;

/// Cancellation token carrying an optional deadline
#[derive(Debug, Clone)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// Create a root context, without deadline, that only dies when cancelled
    #[must_use]
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Derive a child context that can be cancelled on its own
    #[must_use]
    pub fn with_cancel(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Derive a child context expiring at `deadline`, or at the parent's
    /// deadline if that one is sooner
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) => parent.min(deadline),
            None => deadline,
        };

        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Derive a child context expiring `timeout` from now.
    /// A timeout too large to be represented as an instant adds no deadline.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.with_cancel(),
        }
    }

    /// Cancel this context and every context derived from it.
    /// Cancelling twice is a no-op.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub(crate) fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Nearest deadline among this context and its ancestors
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, zero once it has passed
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Whether the context has neither been cancelled nor reached its deadline
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.err().is_none()
    }

    /// Why the context died, `None` while it is still live.
    /// Cancellation takes precedence over an elapsed deadline.
    #[must_use]
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Cancelled);
        }

        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Wait until the context dies
    pub async fn done(&self) -> ContextError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    () = self.token.cancelled() => ContextError::Cancelled,
                    () = tokio::time::sleep_until(deadline) => ContextError::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                ContextError::Cancelled
            }
        }
    }
}
