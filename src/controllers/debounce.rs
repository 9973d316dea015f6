//! # Debounce controller.
//!
//! [`Debounced`] wraps a function so that a burst of calls collapses into at most
//! one leading and one trailing invocation, with an optional `max_wait` ceiling.
//!
//! ## Per-call flow
//! ```text
//! call(args) at t
//!   ├─► new burst = first call | t - last_call >= wait
//!   ├─► invoking  = new burst | t - burst_start >= max_wait
//!   ├─► record last_args, last_call = t (burst_start = t on a new burst)
//!   ├─► invoking && leading && no live timer ──► f(args) now, return result
//!   └─► (re)arm timer for min(wait, max_wait - (t - burst_start)), return cached result
//!
//! timer fire (trailing edge)
//!   ├─► stale id? ──► ignore
//!   ├─► trailing && pending args ──► f(latest args), cache result
//!   └─► otherwise drop pending args
//! ```
//!
//! ## Rules
//! - At most one live timer; every call that does not invoke replaces it.
//! - The wrapped function always runs **outside** the controller lock.
//! - The `max_wait` window opens with the burst and restarts at every invocation.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, trace};

use super::slot::TimerSlot;
use crate::clock::{TimerRef, TokioTimer};
use crate::config::DebounceOptions;
use crate::error::ConfigError;
use crate::events::{Bus, Emitter, EventKind};

type Func<A, R> = Box<dyn Fn(A) -> R + Send + Sync>;

struct State<A, R> {
    last_call: Option<Instant>,
    burst_start: Option<Instant>,
    last_args: Option<A>,
    result: Option<R>,
    timer: TimerSlot,
}

struct Inner<A, R> {
    func: Func<A, R>,
    wait: Duration,
    max_wait: Option<Duration>,
    opts: DebounceOptions,
    timer: TimerRef,
    emitter: Emitter,
    state: Mutex<State<A, R>>,
}

/// Debounced wrapper around a function `A -> R`.
///
/// Cloning yields another handle to the same controller. The live timer is
/// cancelled once the last handle is dropped.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use std::sync::Arc;
/// use pacer::{Debounced, ManualTimer};
///
/// let clock = ManualTimer::new();
/// let save = Debounced::builder(|text: String| text.len(), Duration::from_millis(300))
///     .timer(Arc::new(clock.clone()))
///     .build()
///     .unwrap();
///
/// assert_eq!(save.call("h".into()), None);
/// assert_eq!(save.call("hello".into()), None);
/// clock.advance(Duration::from_millis(300));
/// assert_eq!(save.flush(), Some(5));
/// ```
pub struct Debounced<A, R> {
    inner: Arc<Inner<A, R>>,
}

impl<A, R> Clone for Debounced<A, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, R> Debounced<A, R>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
{
    /// Starts building a debounced wrapper for `func` with quiet period `wait`.
    pub fn builder<F>(func: F, wait: Duration) -> DebounceBuilder<A, R>
    where
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        DebounceBuilder {
            func: Box::new(func),
            wait,
            options: DebounceOptions::default(),
            timer: None,
            bus: None,
            name: None,
        }
    }

    /// Records a call. Invokes synchronously on a leading edge, otherwise (re)arms
    /// the trailing timer.
    ///
    /// Returns the new result when invoked now, else the cached result of the
    /// most recent invocation (`None` before the first one).
    pub fn call(&self, args: A) -> Option<R> {
        let inner = &self.inner;
        let now = inner.timer.now();
        let mut state = inner.state.lock();

        let new_burst = inner.starts_burst(&state, now);
        let invoking = new_burst || inner.max_wait_reached(&state, now);
        state.last_args = Some(args);
        state.last_call = Some(now);
        if new_burst {
            state.burst_start = Some(now);
        }

        if invoking && inner.opts.leading && !state.timer.is_live() {
            if let Some(args) = state.last_args.take() {
                state.burst_start = Some(now);
                drop(state);
                debug!(source = inner.emitter.source(), "leading edge");
                inner.emitter.emit(EventKind::LeadingInvoked);
                return Some(inner.invoke(args));
            }
        }

        let burst_start = *state.burst_start.get_or_insert(now);
        let delay = inner.remaining_wait(now, burst_start);
        Inner::arm(&self.inner, &mut state, delay);
        trace!(source = inner.emitter.source(), ?delay, "trailing edge scheduled");
        state.result.clone()
    }

    /// Drops any pending call and the live timer without invoking.
    pub fn cancel(&self) {
        let mut state = self.inner.state.lock();
        state.timer.cancel();
        state.last_args = None;
        state.last_call = None;
        state.burst_start = None;
        drop(state);
        debug!(source = self.inner.emitter.source(), "cancelled");
        self.inner.emitter.emit(EventKind::Cancelled);
    }

    /// Runs the trailing edge now if a timer is live; otherwise returns the cached result.
    pub fn flush(&self) -> Option<R> {
        let mut state = self.inner.state.lock();
        if !state.timer.cancel() {
            return state.result.clone();
        }
        self.inner.emitter.emit(EventKind::Flushed);
        self.inner.trailing_edge(state)
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
    /// First call, or the first after a quiet gap of at least `wait`.
    fn starts_burst(&self, state: &State<A, R>, now: Instant) -> bool {
        state
            .last_call
            .is_none_or(|last| now.saturating_duration_since(last) >= self.wait)
    }

    fn max_wait_reached(&self, state: &State<A, R>, now: Instant) -> bool {
        match (self.max_wait, state.burst_start) {
            (Some(max), Some(start)) => now.saturating_duration_since(start) >= max,
            _ => false,
        }
    }

    /// `wait`, shortened so the burst never outlives `max_wait`.
    fn remaining_wait(&self, now: Instant, burst_start: Instant) -> Duration {
        match self.max_wait {
            Some(max) => {
                let waited = now.saturating_duration_since(burst_start);
                self.wait.min(max.saturating_sub(waited))
            }
            None => self.wait,
        }
    }

    fn arm(this: &Arc<Self>, state: &mut State<A, R>, delay: Duration) {
        let weak: Weak<Self> = Arc::downgrade(this);
        state.timer.arm(this.timer.as_ref(), delay, move |id| {
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.fire(id);
                }
            })
        });
        this.emitter
            .emit_with(EventKind::TimerScheduled, |ev| ev.with_delay(delay));
    }

    fn fire(&self, id: u64) {
        let mut state = self.state.lock();
        if !state.timer.release(id) {
            trace!(source = self.emitter.source(), id, "stale timer fire ignored");
            return;
        }
        self.trailing_edge(state);
    }

    /// Consumes the pending call. The timer slot must already be cleared.
    ///
    /// An invocation restarts the `max_wait` window; a skipped edge keeps it, so a
    /// leading-only burst still leads again once `max_wait` has passed.
    fn trailing_edge(&self, mut state: MutexGuard<'_, State<A, R>>) -> Option<R> {
        let args = state.last_args.take().filter(|_| self.opts.trailing);
        match args {
            Some(args) => {
                state.burst_start = Some(self.timer.now());
                drop(state);
                debug!(source = self.emitter.source(), "trailing edge");
                self.emitter.emit(EventKind::TrailingInvoked);
                Some(self.invoke(args))
            }
            None => {
                let cached = state.result.clone();
                drop(state);
                self.emitter.emit(EventKind::TrailingSkipped);
                cached
            }
        }
    }

    fn invoke(&self, args: A) -> R {
        let result = (self.func)(args);
        self.state.lock().result = Some(result.clone());
        result
    }
}

/// Builder for [`Debounced`].
pub struct DebounceBuilder<A, R> {
    func: Func<A, R>,
    wait: Duration,
    options: DebounceOptions,
    timer: Option<TimerRef>,
    bus: Option<Bus>,
    name: Option<Arc<str>>,
}

impl<A, R> DebounceBuilder<A, R>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
{
    /// Sets the edge policy (default: trailing only).
    pub fn options(mut self, options: DebounceOptions) -> Self {
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

    /// Name used as the `source` of events and in logs (default: `"debounce"`).
    pub fn name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Validates the options and builds the controller.
    ///
    /// Fails with [`ConfigError::NoEdges`] when both edges are disabled, and with
    /// [`ConfigError::NoRuntime`] when no timer was given outside a tokio runtime.
    pub fn build(self) -> Result<Debounced<A, R>, ConfigError> {
        self.options.validate()?;
        let timer: TimerRef = match self.timer {
            Some(timer) => timer,
            None => Arc::new(TokioTimer::current()?),
        };
        let name = self.name.unwrap_or_else(|| Arc::from("debounce"));

        Ok(Debounced {
            inner: Arc::new(Inner {
                func: self.func,
                wait: self.wait,
                max_wait: self.options.max_wait_for(self.wait),
                opts: self.options,
                timer,
                emitter: Emitter::new(name, self.bus),
                state: Mutex::new(State {
                    last_call: None,
                    burst_start: None,
                    last_args: None,
                    result: None,
                    timer: TimerSlot::new(),
                }),
            }),
        })
    }
}

/// Debounces `func` with quiet period `wait` on the current tokio runtime.
///
/// Shorthand for [`Debounced::builder`] with the given options.
pub fn debounce<A, R, F>(
    func: F,
    wait: Duration,
    options: DebounceOptions,
) -> Result<Debounced<A, R>, ConfigError>
where
    F: Fn(A) -> R + Send + Sync + 'static,
    A: Send + 'static,
    R: Clone + Send + 'static,
{
    Debounced::builder(func, wait).options(options).build()
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

    /// Debounced recorder: each invocation logs `(virtual ms, arg)` and returns the arg.
    fn recorder(
        options: DebounceOptions,
    ) -> (Debounced<u32, u32>, ManualTimer, Arc<Mutex<Vec<(u128, u32)>>>) {
        let clock = ManualTimer::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let (c, l) = (clock.clone(), log.clone());
        let debounced = Debounced::builder(
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
        (debounced, clock, log)
    }

    #[test]
    fn burst_collapses_into_one_trailing_call() {
        let (d, clock, log) = recorder(DebounceOptions::default());

        for i in 0..10 {
            assert_eq!(d.call(i), None);
            clock.advance(ms(100));
        }
        // last call at t=900
        clock.advance(ms(899));
        assert!(log.lock().is_empty());

        clock.advance(ms(1));
        assert_eq!(*log.lock(), vec![(1900, 9)]);
        assert!(!d.pending());

        clock.advance(ms(5000));
        assert_eq!(log.lock().len(), 1);
        assert_eq!(d.last_result(), Some(9));
    }

    #[test]
    fn leading_only_fires_once_at_burst_start() {
        let (d, clock, log) = recorder(DebounceOptions::leading_only());

        assert_eq!(d.call(1), Some(1));
        for i in 2..10 {
            clock.advance(ms(100));
            assert_eq!(d.call(i), Some(1));
        }
        clock.advance(ms(3000));
        assert_eq!(*log.lock(), vec![(0, 1)]);

        // a new burst after a quiet period leads again
        assert_eq!(d.call(42), Some(42));
        assert_eq!(log.lock().last(), Some(&(3800, 42)));
    }

    #[test]
    fn leading_and_trailing_fire_at_both_ends() {
        let opts = DebounceOptions {
            leading: true,
            ..DebounceOptions::default()
        };
        let (d, clock, log) = recorder(opts);

        assert_eq!(d.call(1), Some(1));
        clock.advance(ms(200));
        assert_eq!(d.call(2), Some(1));
        clock.advance(ms(1000));
        assert_eq!(*log.lock(), vec![(0, 1), (1200, 2)]);
    }

    #[test]
    fn single_leading_call_does_not_echo_on_trailing_edge() {
        let opts = DebounceOptions {
            leading: true,
            ..DebounceOptions::default()
        };
        let (d, clock, log) = recorder(opts);

        d.call(7);
        clock.advance(ms(2000));
        assert_eq!(*log.lock(), vec![(0, 7)]);
    }

    #[test]
    fn max_wait_forces_an_invocation_during_a_continuous_burst() {
        let (d, clock, log) = recorder(DebounceOptions::default().with_max_wait(ms(1500)));

        for i in 0..30 {
            d.call(i);
            clock.advance(ms(100));
        }

        let log = log.lock();
        assert!(!log.is_empty());
        let (first_at, first_arg) = log[0];
        assert!(first_at <= 1500, "first invocation at {first_at}");
        assert_eq!((first_at, first_arg), (1500, 14));
        for pair in log.windows(2) {
            assert!(pair[1].0 - pair[0].0 <= 1500);
        }
    }

    #[test]
    fn leading_burst_respects_max_wait() {
        let opts = DebounceOptions {
            leading: true,
            ..DebounceOptions::default()
        }
        .with_max_wait(ms(1500));
        let (d, clock, log) = recorder(opts);

        for i in 0..30 {
            d.call(i);
            clock.advance(ms(100));
        }

        let log = log.lock();
        assert_eq!(*log, vec![(0, 0), (1500, 14), (3000, 29)]);
        for pair in log.windows(2) {
            assert!(pair[1].0 - pair[0].0 <= 1500, "gap in {pair:?}");
        }
    }

    #[test]
    fn quiet_gap_restarts_the_max_wait_window() {
        let (d, clock, log) = recorder(DebounceOptions::default().with_max_wait(ms(1500)));

        d.call(1);
        clock.advance(ms(3000));
        assert_eq!(*log.lock(), vec![(1000, 1)]);

        // a stale window would fire this immediately
        d.call(2);
        clock.advance(ms(999));
        assert_eq!(log.lock().len(), 1);
        clock.advance(ms(1));
        assert_eq!(log.lock().last(), Some(&(4000, 2)));
    }

    #[test]
    fn cancel_is_terminal() {
        let (d, clock, log) = recorder(DebounceOptions::default());

        d.call(1);
        clock.advance(ms(500));
        d.call(2);
        assert!(d.pending());

        d.cancel();
        assert!(!d.pending());
        clock.advance(ms(10_000));
        assert!(log.lock().is_empty());
        assert_eq!(clock.scheduled(), 0);
    }

    #[test]
    fn flush_runs_trailing_edge_immediately() {
        let (d, clock, log) = recorder(DebounceOptions::default());

        assert_eq!(d.flush(), None);
        d.call(5);
        assert_eq!(d.flush(), Some(5));
        assert!(!d.pending());

        clock.advance(ms(2000));
        assert_eq!(*log.lock(), vec![(0, 5)]);
        assert_eq!(d.flush(), Some(5));
    }

    #[test]
    fn flush_without_trailing_returns_cached_result() {
        let (d, clock, log) = recorder(DebounceOptions::leading_only());

        d.call(1);
        clock.advance(ms(10));
        d.call(2);
        assert!(d.pending());
        assert_eq!(d.flush(), Some(1));
        assert_eq!(log.lock().len(), 1);
    }

    #[test]
    fn pending_tracks_the_live_timer() {
        let (d, clock, _log) = recorder(DebounceOptions::default());

        assert!(!d.pending());
        d.call(1);
        assert!(d.pending());
        clock.advance(WAIT);
        assert!(!d.pending());
    }

    #[test]
    fn zero_wait_fires_on_next_tick() {
        let clock = ManualTimer::new();
        let hits = Arc::new(Mutex::new(0));
        let h = hits.clone();
        let d = Debounced::builder(move |_: ()| *h.lock() += 1, Duration::ZERO)
            .timer(Arc::new(clock.clone()))
            .build()
            .unwrap();

        d.call(());
        assert_eq!(*hits.lock(), 0);
        clock.advance(Duration::ZERO);
        assert_eq!(*hits.lock(), 1);
    }

    #[test]
    fn both_edges_disabled_is_rejected() {
        let opts = DebounceOptions {
            leading: false,
            trailing: false,
            max_wait: None,
        };
        let err = Debounced::builder(|x: u8| x, WAIT)
            .options(opts)
            .timer(Arc::new(ManualTimer::new()))
            .build()
            .err();
        assert_eq!(err, Some(ConfigError::NoEdges));
    }

    #[test]
    fn wrapped_function_may_reenter_its_controller() {
        let clock = ManualTimer::new();
        let slot: Arc<Mutex<Option<Debounced<u32, u32>>>> = Arc::new(Mutex::new(None));
        let s = slot.clone();
        let d = Debounced::builder(
            move |n: u32| {
                if let Some(me) = s.lock().clone() {
                    assert!(!me.pending());
                }
                n
            },
            WAIT,
        )
        .options(DebounceOptions::leading_only())
        .timer(Arc::new(clock.clone()))
        .build()
        .unwrap();
        *slot.lock() = Some(d.clone());

        assert_eq!(d.call(3), Some(3));
        slot.lock().take();
    }

    fn rejects_zero(options: DebounceOptions) -> (Debounced<u32, u32>, ManualTimer) {
        let clock = ManualTimer::new();
        let debounced = Debounced::builder(
            |n: u32| {
                assert_ne!(n, 0, "zero is rejected");
                n
            },
            WAIT,
        )
        .options(options)
        .timer(Arc::new(clock.clone()))
        .build()
        .unwrap();
        (debounced, clock)
    }

    #[test]
    fn panic_on_the_leading_edge_leaves_the_controller_usable() {
        let opts = DebounceOptions {
            leading: true,
            ..DebounceOptions::default()
        };
        let (d, clock) = rejects_zero(opts);

        assert!(catch_unwind(AssertUnwindSafe(|| d.call(0))).is_err());
        assert!(!d.pending());
        assert_eq!(d.last_result(), None);

        clock.advance(WAIT);
        assert_eq!(d.call(5), Some(5));
        clock.advance(ms(100));
        assert_eq!(d.call(6), Some(5));
        clock.advance(WAIT);
        assert_eq!(d.last_result(), Some(6));
        assert!(!d.pending());
    }

    #[test]
    fn panic_on_a_flushed_trailing_edge_leaves_the_controller_usable() {
        let (d, clock) = rejects_zero(DebounceOptions::default());

        d.call(0);
        assert!(d.pending());
        assert!(catch_unwind(AssertUnwindSafe(|| d.flush())).is_err());
        assert!(!d.pending());
        assert_eq!(clock.scheduled(), 0);

        assert_eq!(d.call(3), None);
        clock.advance(WAIT);
        assert_eq!(d.last_result(), Some(3));
        assert!(!d.pending());
    }

    #[test]
    fn errors_from_the_wrapped_function_are_cached_unchanged() {
        let clock = ManualTimer::new();
        let d = Debounced::builder(
            |n: u32| {
                if n % 2 == 0 {
                    Ok(n)
                } else {
                    Err(format!("odd input {n}"))
                }
            },
            WAIT,
        )
        .options(DebounceOptions {
            leading: true,
            ..DebounceOptions::default()
        })
        .timer(Arc::new(clock.clone()))
        .build()
        .unwrap();

        let odd = Err("odd input 3".to_string());
        assert_eq!(d.call(3), Some(odd.clone()));
        assert_eq!(d.last_result(), Some(odd.clone()));

        clock.advance(ms(10));
        assert_eq!(d.call(4), Some(odd));
        clock.advance(WAIT);
        assert_eq!(d.last_result(), Some(Ok(4)));
    }

    #[test]
    fn dropping_the_last_handle_cancels_the_timer() {
        let (d, clock, log) = recorder(DebounceOptions::default());
        d.call(1);
        assert_eq!(clock.scheduled(), 1);

        drop(d);
        assert_eq!(clock.scheduled(), 0);
        clock.advance(ms(2000));
        assert!(log.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn runs_on_the_tokio_timer() {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let h = hits.clone();
        let d = debounce(
            move |s: &'static str| h.lock().push(s),
            ms(50),
            DebounceOptions::default(),
        )
        .unwrap();

        d.call("a");
        d.call("b");
        tokio::time::sleep(ms(49)).await;
        assert!(hits.lock().is_empty());

        tokio::time::sleep(ms(2)).await;
        assert_eq!(*hits.lock(), vec!["b"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_calls_and_cancels_settle_with_nothing_pending() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let d = debounce(
            move |_: usize| {
                h.fetch_add(1, Ordering::SeqCst);
            },
            ms(2),
            DebounceOptions {
                leading: true,
                ..DebounceOptions::default()
            },
        )
        .unwrap();

        let workers: Vec<_> = (0..4usize)
            .map(|t| {
                let d = d.clone();
                std::thread::spawn(move || {
                    for i in 0..400usize {
                        d.call(i);
                        if i % 37 == t {
                            d.cancel();
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

        d.cancel();
        assert!(!d.pending());
        // an invocation already released by its timer may still be running
        tokio::time::sleep(ms(10)).await;
        let settled = hits.load(Ordering::SeqCst);
        assert!(settled > 0);

        tokio::time::sleep(ms(50)).await;
        assert_eq!(hits.load(Ordering::SeqCst), settled);
        assert!(!d.pending());
    }

    #[tokio::test]
    async fn events_are_published_when_a_bus_is_attached() {
        let clock = ManualTimer::new();
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let d = Debounced::builder(|n: u8| n, WAIT)
            .timer(Arc::new(clock.clone()))
            .bus(bus)
            .name("search")
            .build()
            .unwrap();

        d.call(1);
        clock.advance(WAIT);

        let scheduled = rx.recv().await.unwrap();
        assert_eq!(scheduled.kind, EventKind::TimerScheduled);
        assert_eq!(scheduled.source.as_deref(), Some("search"));
        assert_eq!(scheduled.delay_ms, Some(1000));
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::TrailingInvoked);
    }
}
