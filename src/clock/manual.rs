//! # Manually driven virtual clock.
//!
//! [`ManualTimer`] keeps a virtual "now" and a deadline-ordered queue of callbacks.
//! Time only moves when [`ManualTimer::advance`] (or [`ManualTimer::advance_to`]) is
//! called; every callback whose deadline is reached fires during that call, in
//! deadline order (ties in scheduling order), with "now" set to its deadline.
//!
//! Cancelled entries are dropped from the queue on the next `schedule` or when
//! their deadline is reached, whichever comes first.
//!
//! Callbacks run without the internal lock held, so they may call
//! [`Timer::schedule`] themselves; a callback scheduled for a deadline inside the
//! advanced range fires in the same `advance` call.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::{Callback, Timer, TimerHandle};

struct Entry {
    token: CancellationToken,
    callback: Callback,
}

struct Inner {
    now: Instant,
    seq: u64,
    queue: BTreeMap<(Instant, u64), Entry>,
}

/// Deterministic timer for tests and simulations.
///
/// Cloning yields another handle to the same virtual clock.
#[derive(Clone)]
pub struct ManualTimer {
    inner: Arc<Mutex<Inner>>,
    origin: Instant,
}

impl ManualTimer {
    /// Creates a clock whose origin is the current wall-clock instant.
    pub fn new() -> Self {
        let origin = Instant::now();
        Self {
            inner: Arc::new(Mutex::new(Inner {
                now: origin,
                seq: 0,
                queue: BTreeMap::new(),
            })),
            origin,
        }
    }

    /// Virtual time elapsed since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.inner.lock().now - self.origin
    }

    /// Number of scheduled callbacks that have neither fired nor been cancelled.
    pub fn scheduled(&self) -> usize {
        self.inner
            .lock()
            .queue
            .values()
            .filter(|e| !e.token.is_cancelled())
            .count()
    }

    /// Moves virtual time forward by `by`, firing every callback that becomes due.
    pub fn advance(&self, by: Duration) {
        let target = self.inner.lock().now + by;
        self.advance_to(target);
    }

    /// Moves virtual time to `target` (no-op for instants in the past).
    pub fn advance_to(&self, target: Instant) {
        loop {
            let due = {
                let mut inner = self.inner.lock();
                let next = inner
                    .queue
                    .first_key_value()
                    .map(|(key, _)| *key)
                    .filter(|(deadline, _)| *deadline <= target);
                match next {
                    Some(key) => {
                        inner.now = inner.now.max(key.0);
                        inner.queue.remove(&key)
                    }
                    None => {
                        inner.now = inner.now.max(target);
                        None
                    }
                }
            };

            match due {
                Some(entry) if !entry.token.is_cancelled() => (entry.callback)(),
                Some(_) => {}
                None => break,
            }
        }
    }
}

impl Default for ManualTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for ManualTimer {
    fn now(&self) -> Instant {
        self.inner.lock().now
    }

    fn schedule(&self, delay: Duration, callback: Callback) -> TimerHandle {
        let token = CancellationToken::new();
        let mut inner = self.inner.lock();
        inner.queue.retain(|_, entry| !entry.token.is_cancelled());
        let key = (inner.now + delay, inner.seq);
        inner.seq += 1;
        inner.queue.insert(
            key,
            Entry {
                token: token.clone(),
                callback,
            },
        );
        TimerHandle::new(token)
    }
}
