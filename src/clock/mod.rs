//! # Time source and cancellable timers.
//!
//! Controllers never touch the system clock directly. They ask a [`Timer`] for
//! the current instant and for one-shot callbacks, which makes the timer the single
//! substitution point for deterministic tests.
//!
//! ## Implementations
//! - [`TokioTimer`]: spawns a sleeping task per callback on a tokio runtime.
//!   Reads time through `tokio::time::Instant`, so a paused test clock applies.
//! - [`ManualTimer`]: virtual time advanced by hand; callbacks fire synchronously
//!   inside [`ManualTimer::advance`].
//!
//! ## Rules
//! - A [`TimerHandle`] cancels its callback when [`TimerHandle::cancel`] is called.
//! - Dropping a handle does **not** cancel the callback.
//! - A callback runs at most once, and never after its handle was cancelled
//!   (checked right before the callback runs).

mod manual;
mod tokio_timer;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

pub use manual::ManualTimer;
pub use tokio_timer::TokioTimer;

/// One-shot callback executed when a timer fires.
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Shared reference to a timer implementation.
pub type TimerRef = Arc<dyn Timer>;

/// Source of time and delayed one-shot callbacks.
pub trait Timer: Send + Sync + 'static {
    /// Returns the current instant as seen by this timer.
    fn now(&self) -> Instant;

    /// Runs `callback` once after `delay`, unless the returned handle is cancelled first.
    fn schedule(&self, delay: Duration, callback: Callback) -> TimerHandle;
}

/// Cancellation handle for a scheduled callback.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Prevents the callback from running. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
