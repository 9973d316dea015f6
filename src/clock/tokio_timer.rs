//! # Tokio-backed timer.
//!
//! Each scheduled callback is a spawned task racing a sleep against the handle's
//! cancellation token:
//!
//! ```text
//! schedule(delay, cb) ──► spawn ──► select! {
//!                                     token.cancelled() ─► drop cb
//!                                     sleep(delay)      ─► token still live? ─► cb()
//!                                   }
//! ```

use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use super::{Callback, Timer, TimerHandle};
use crate::error::ConfigError;

/// Timer driven by a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioTimer {
    runtime: Handle,
}

impl TokioTimer {
    /// Creates a timer bound to the given runtime handle.
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Creates a timer bound to the runtime of the calling context.
    ///
    /// Fails with [`ConfigError::NoRuntime`] outside of a tokio runtime.
    pub fn current() -> Result<Self, ConfigError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| ConfigError::NoRuntime)
    }
}

impl Timer for TokioTimer {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn schedule(&self, delay: Duration, callback: Callback) -> TimerHandle {
        let token = CancellationToken::new();
        let child = token.clone();

        self.runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = child.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if !child.is_cancelled() {
                        callback();
                    }
                }
            }
        });

        TimerHandle::new(token)
    }
}
