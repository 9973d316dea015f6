//! # Throttle controller.
//!
//! [`Throttled`] wraps a function so that it runs at most once per `wait` window.
//! Suppressed calls are remembered; with `trailing` enabled the latest of them runs
//! at the window boundary.
//!
//! ```text
//! call(args) at t
//!   ├─► first call: leading ? treat as boundary crossed : last_call = t
//!   ├─► elapsed = t - last_call
//!   ├─► elapsed >= wait ──► cancel timer, last_call = t, f(args) now
//!   └─► store args; no live timer && trailing ──► arm for wait - elapsed
//!
//! timer fire at boundary B
//!   └─► last_call = B, f(latest args)
//! ```
//!
//! The fire path stamps the scheduled boundary rather than the observed fire time,
//! so a late timer never stretches the following window.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::slot::TimerSlot;
use crate::clock::{TimerRef, TokioTimer};
use crate::config::ThrottleOptions;
use crate::error::ConfigError;
use crate::events::{Bus, Emitter, EventKind};

type Func<A, R> = Box<dyn Fn(A) -> R + Send + Sync>;

struct State<A, R> {
    last_call: Option<Instant>,
    last_args: Option<A>,
    result: Option<R>,
    timer: TimerSlot,
}

struct Inner<A, R> {
    func: Func<A, R>,
    wait: Duration,
    opts: ThrottleOptions,
    timer: TimerRef,
    emitter: Emitter,
    state: Mutex<State<A, R>>,
}

/// Throttled wrapper around a function `A -> R`.
///
/// Cloning yields another handle to the same controller.
pub struct Throttled<A, R> {
    inner: Arc<Inner<A, R>>,
}

impl<A, R> Clone for Throttled<A, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, R> Throttled<A, R>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
{
    /// Starts building a throttled wrapper for `func` with window `wait`.
    pub fn builder<F>(func: F, wait: Duration) -> ThrottleBuilder<A, R>
    where
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        ThrottleBuilder {
            func: Box::new(func),
            wait,
            options: ThrottleOptions::default(),
            timer: None,
            bus: None,
            name: None,
        }
    }

    /// Records a call, invoking immediately once a window boundary has been crossed.
    ///
    /// Returns the new result when invoked now, else the cached one.
    pub fn call(&self, args: A) -> Option<R> {
        let inner = &self.inner;
        let now = inner.timer.now();
        let mut state = inner.state.lock();

        let last_call = state.last_call;
        let elapsed = match last_call {
            Some(last) => now.saturating_duration_since(last),
            None if inner.opts.leading => inner.wait,
            None => {
                state.last_call = Some(now);
                Duration::ZERO
            }
        };
        state.last_args = Some(args);

        if elapsed >= inner.wait {
            state.timer.cancel();
            state.last_call = Some(now);
            if let Some(args) = state.last_args.take() {
                drop(state);
                debug!(source = inner.emitter.source(), "window boundary crossed");
                inner.emitter.emit(EventKind::LeadingInvoked);
                return Some(inner.invoke(args));
            }
            return state.result.clone();
        }

        if inner.opts.trailing && !state.timer.is_live() {
            let delay = inner.wait - elapsed;
            Inner::arm(inner, &mut state, delay, now + delay);
        }
        trace!(source = inner.emitter.source(), ?elapsed, "call suppressed");
        state.result.clone()
    }

    /// Drops the pending trailing call and resets the window.
    pub fn cancel(&self) {
        let mut state = self.inner.state.lock();
        state.timer.cancel();
        state.last_call = None;
        state.last_args = None;
        drop(state);
        debug!(source = self.inner.emitter.source(), "cancelled");
        self.inner.emitter.emit(EventKind::Cancelled);
    }

    /// True while a trailing timer is live.
    pub fn pending(&self) -> bool {
        self.inner.state.lock().timer.is_live()
    }

    /// Cached result of the most recent invocation.
    pub fn last_result(&self) -> Option<R> {
        self.inner.state.lock().result.clone()
    }
}

impl<A, R> Inner<A, R>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
{
    fn arm(this: &Arc<Self>, state: &mut State<A, R>, delay: Duration, boundary: Instant) {
        let weak: Weak<Self> = Arc::downgrade(this);
        state.timer.arm(this.timer.as_ref(), delay, move |id| {
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.fire(id, boundary);
                }
            })
        });
        this.emitter
            .emit_with(EventKind::TimerScheduled, |ev| ev.with_delay(delay));
    }

    fn fire(&self, id: u64, boundary: Instant) {
        let mut state = self.state.lock();
        if !state.timer.release(id) {
            trace!(source = self.emitter.source(), id, "stale timer fire ignored");
            return;
        }
        state.last_call = Some(boundary);
        match state.last_args.take() {
            Some(args) => {
                drop(state);
                debug!(source = self.emitter.source(), "trailing edge");
                self.emitter.emit(EventKind::TrailingInvoked);
                self.invoke(args);
            }
            None => {
                drop(state);
                self.emitter.emit(EventKind::TrailingSkipped);
            }
        }
    }

    fn invoke(&self, args: A) -> R {
        let result = (self.func)(args);
        self.state.lock().result = Some(result.clone());
        result
    }
}

/// Builder for [`Throttled`].
pub struct ThrottleBuilder<A, R> {
    func: Func<A, R>,
    wait: Duration,
    options: ThrottleOptions,
    timer: Option<TimerRef>,
    bus: Option<Bus>,
    name: Option<Arc<str>>,
}

impl<A, R> ThrottleBuilder<A, R>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
{
    /// Sets the edge policy (default: both edges).
    pub fn options(mut self, options: ThrottleOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the time source (default: [`TokioTimer::current`]).
    pub fn timer(mut self, timer: TimerRef) -> Self {
        self.timer = Some(timer);
        self
    }

    /// Publishes lifecycle events onto `bus`.
    pub fn bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Name used as the `source` of events and in logs (default: `"throttle"`).
    pub fn name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the controller; fails with [`ConfigError::NoRuntime`] when no timer
    /// was given outside a tokio runtime.
    pub fn build(self) -> Result<Throttled<A, R>, ConfigError> {
        let timer: TimerRef = match self.timer {
            Some(timer) => timer,
            None => Arc::new(TokioTimer::current()?),
        };
        let name = self.name.unwrap_or_else(|| Arc::from("throttle"));

        Ok(Throttled {
            inner: Arc::new(Inner {
                func: self.func,
                wait: self.wait,
                opts: self.options,
                timer,
                emitter: Emitter::new(name, self.bus),
                state: Mutex::new(State {
                    last_call: None,
                    last_args: None,
                    result: None,
                    timer: TimerSlot::new(),
                }),
            }),
        })
    }
}

/// Throttles `func` to one invocation per `wait` on the current tokio runtime.
pub fn throttle<A, R, F>(
    func: F,
    wait: Duration,
    options: ThrottleOptions,
) -> Result<Throttled<A, R>, ConfigError>
where
    F: Fn(A) -> R + Send + Sync + 'static,
    A: Send + 'static,
    R: Clone + Send + 'static,
{
    Throttled::builder(func, wait).options(options).build()
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::clock::ManualTimer;

    const WAIT: Duration = Duration::from_millis(1000);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn recorder(
        options: ThrottleOptions,
    ) -> (Throttled<u32, u32>, ManualTimer, Arc<Mutex<Vec<(u128, u32)>>>) {
        let clock = ManualTimer::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let (c, l) = (clock.clone(), log.clone());
        let throttled = Throttled::builder(
            move |arg: u32| {
                l.lock().push((c.elapsed().as_millis(), arg));
                arg
            },
            WAIT,
        )
        .options(options)
        .timer(Arc::new(clock.clone()))
        .build()
        .unwrap();
        (throttled, clock, log)
    }

    #[test]
    fn steady_calls_invoke_once_per_window() {
        let (t, clock, log) = recorder(ThrottleOptions::default());

        for i in 0..30 {
            t.call(i);
            clock.advance(ms(100));
        }
        clock.advance(ms(5000));

        let log = log.lock();
        let at: Vec<u128> = log.iter().map(|(ms, _)| *ms).collect();
        assert_eq!(at, vec![0, 1000, 2000, 3000]);
        assert_eq!(
            log.iter().map(|(_, arg)| *arg).collect::<Vec<_>>(),
            vec![0, 9, 19, 29]
        );
        for pair in at.windows(2) {
            assert!(pair[1] - pair[0] >= 1000);
        }
    }

    #[test]
    fn first_call_invokes_immediately_with_leading() {
        let (t, _clock, log) = recorder(ThrottleOptions::default());
        assert_eq!(t.call(7), Some(7));
        assert!(!t.pending());
        assert_eq!(*log.lock(), vec![(0, 7)]);
    }

    #[test]
    fn trailing_only_waits_for_the_window_end() {
        let opts = ThrottleOptions {
            leading: false,
            trailing: true,
        };
        let (t, clock, log) = recorder(opts);

        assert_eq!(t.call(1), None);
        clock.advance(ms(300));
        assert_eq!(t.call(2), None);
        assert!(t.pending());

        clock.advance(ms(700));
        assert_eq!(*log.lock(), vec![(1000, 2)]);
        assert_eq!(t.last_result(), Some(2));
    }

    #[test]
    fn leading_only_drops_suppressed_calls() {
        let opts = ThrottleOptions {
            leading: true,
            trailing: false,
        };
        let (t, clock, log) = recorder(opts);

        for i in 0..25 {
            t.call(i);
            assert!(!t.pending());
            clock.advance(ms(100));
        }
        clock.advance(ms(5000));
        assert_eq!(*log.lock(), vec![(0, 0), (1000, 10), (2000, 20)]);
    }

    #[test]
    fn trailing_call_uses_latest_args() {
        let (t, clock, log) = recorder(ThrottleOptions::default());

        t.call(1);
        clock.advance(ms(10));
        t.call(2);
        t.call(3);
        assert_eq!(t.call(4), Some(1));

        clock.advance(WAIT);
        assert_eq!(*log.lock(), vec![(0, 1), (1000, 4)]);
    }

    #[test]
    fn call_after_quiet_period_starts_a_new_window() {
        let (t, clock, log) = recorder(ThrottleOptions::default());

        t.call(1);
        clock.advance(ms(2500));
        assert_eq!(t.call(2), Some(2));
        assert_eq!(*log.lock(), vec![(0, 1), (2500, 2)]);
    }

    #[test]
    fn cancel_is_terminal() {
        let (t, clock, log) = recorder(ThrottleOptions::default());

        t.call(1);
        clock.advance(ms(100));
        t.call(2);
        assert!(t.pending());

        t.cancel();
        assert!(!t.pending());
        clock.advance(ms(10_000));
        assert_eq!(*log.lock(), vec![(0, 1)]);

        // state is reset: the next call leads again
        assert_eq!(t.call(3), Some(3));
    }

    #[test]
    fn trailing_invoke_opens_the_next_window() {
        let (t, clock, log) = recorder(ThrottleOptions::default());

        t.call(1);
        clock.advance(ms(100));
        t.call(2);
        clock.advance(ms(900));
        // trailing ran at the 1000ms boundary; a call shortly after is suppressed
        clock.advance(ms(50));
        assert_eq!(t.call(3), Some(2));
        assert!(t.pending());

        clock.advance(ms(950));
        assert_eq!(*log.lock(), vec![(0, 1), (1000, 2), (2000, 3)]);
    }

    fn rejects_zero() -> (Throttled<u32, u32>, ManualTimer) {
        let clock = ManualTimer::new();
        let throttled = Throttled::builder(
            |n: u32| {
                assert_ne!(n, 0, "zero is rejected");
                n
            },
            WAIT,
        )
        .timer(Arc::new(clock.clone()))
        .build()
        .unwrap();
        (throttled, clock)
    }

    #[test]
    fn panic_on_the_leading_edge_leaves_the_controller_usable() {
        let (t, clock) = rejects_zero();

        assert!(catch_unwind(AssertUnwindSafe(|| t.call(0))).is_err());
        assert!(!t.pending());
        assert_eq!(t.last_result(), None);

        clock.advance(ms(10));
        assert_eq!(t.call(1), None);
        assert!(t.pending());
        clock.advance(ms(990));
        assert_eq!(t.last_result(), Some(1));
        assert!(!t.pending());
    }

    #[test]
    fn panic_on_the_trailing_edge_leaves_the_controller_usable() {
        let (t, clock) = rejects_zero();

        assert_eq!(t.call(1), Some(1));
        clock.advance(ms(10));
        t.call(0);
        assert!(catch_unwind(AssertUnwindSafe(|| clock.advance(ms(990)))).is_err());
        assert!(!t.pending());

        assert_eq!(t.call(2), Some(1));
        assert!(t.pending());
        clock.advance(WAIT);
        assert_eq!(t.last_result(), Some(2));
        assert!(!t.pending());
    }

    #[test]
    fn errors_from_the_wrapped_function_are_cached_unchanged() {
        let clock = ManualTimer::new();
        let t = Throttled::builder(
            |n: u32| {
                if n % 2 == 0 {
                    Ok(n)
                } else {
                    Err(format!("odd input {n}"))
                }
            },
            WAIT,
        )
        .timer(Arc::new(clock.clone()))
        .build()
        .unwrap();

        let odd = Err("odd input 3".to_string());
        assert_eq!(t.call(3), Some(odd.clone()));
        assert_eq!(t.last_result(), Some(odd.clone()));

        clock.advance(ms(10));
        assert_eq!(t.call(4), Some(odd));
        clock.advance(WAIT);
        assert_eq!(t.last_result(), Some(Ok(4)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_calls_and_cancels_settle_with_nothing_pending() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let t = throttle(
            move |_: usize| {
                h.fetch_add(1, Ordering::SeqCst);
            },
            ms(2),
            ThrottleOptions::default(),
        )
        .unwrap();

        let workers: Vec<_> = (0..4usize)
            .map(|n| {
                let t = t.clone();
                std::thread::spawn(move || {
                    for i in 0..400usize {
                        t.call(i);
                        if i % 37 == n {
                            t.cancel();
                        }
                        if i % 50 == 0 {
                            std::thread::sleep(ms(1));
                        }
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        t.cancel();
        assert!(!t.pending());
        // an invocation already released by its timer may still be running
        tokio::time::sleep(ms(10)).await;
        let settled = hits.load(Ordering::SeqCst);
        assert!(settled > 0);

        tokio::time::sleep(ms(50)).await;
        assert_eq!(hits.load(Ordering::SeqCst), settled);
        assert!(!t.pending());
    }

    #[tokio::test]
    async fn events_are_published_when_a_bus_is_attached() {
        let clock = ManualTimer::new();
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let t = Throttled::builder(|n: u8| n, WAIT)
            .timer(Arc::new(clock.clone()))
            .bus(bus)
            .build()
            .unwrap();

        t.call(1);
        t.call(2);
        clock.advance(WAIT);

        let kinds = [
            EventKind::LeadingInvoked,
            EventKind::TimerScheduled,
            EventKind::TrailingInvoked,
        ];
        for kind in kinds {
            let ev = rx.recv().await.unwrap();
            assert_eq!(ev.kind, kind);
            assert_eq!(ev.source.as_deref(), Some("throttle"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_on_the_tokio_timer() {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let h = hits.clone();
        let t = throttle(
            move |n: u32| h.lock().push(n),
            ms(100),
            ThrottleOptions::default(),
        )
        .unwrap();

        t.call(1);
        t.call(2);
        assert_eq!(*hits.lock(), vec![1]);

        tokio::time::sleep(ms(101)).await;
        assert_eq!(*hits.lock(), vec![1, 2]);
    }
}
