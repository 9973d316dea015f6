use std::collections::VecDeque;
use std::future::Future;
use std::panic;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::report::{RunReport, RunState, TaskFailure};
use crate::config::RunnerConfig;
use crate::error::{ConfigError, RunError};
use crate::events::{Bus, Emitter, EventKind};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Policy {
    FailFast,
    Settle,
}

#[derive(Default)]
struct Runs {
    active: usize,
    cancelled: bool,
}

/// Counts a run as active until dropped, including on unwind.
struct ActiveRun<'a>(&'a Mutex<Runs>);

impl<'a> ActiveRun<'a> {
    fn enter(runs: &'a Mutex<Runs>) -> Self {
        runs.lock().active += 1;
        Self(runs)
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        self.0.lock().active -= 1;
    }
}

struct Drained<T, E> {
    results: Vec<T>,
    failures: Vec<TaskFailure<E>>,
    not_started: usize,
    cancelled: bool,
}

/// Runs task factories with at most `concurrency` in flight.
///
/// A task is any `FnOnce() -> Fut` where `Fut` resolves to `Result<T, E>`. The
/// factory is called at admission, so nothing starts before a slot is free.
///
/// # Example
/// ```
/// use pacer::{BoundedRunner, RunnerConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let runner = BoundedRunner::new(RunnerConfig::with_concurrency(2)).unwrap();
/// let tasks = (1..=4u32).map(|n| move || async move { Ok::<_, std::io::Error>(n * 10) });
///
/// let mut out = runner.run(tasks).await.unwrap();
/// out.sort();
/// assert_eq!(out, vec![10, 20, 30, 40]);
/// # }
/// ```
///
/// Runs may overlap on one runner. Each run applies the concurrency limit to its
/// own tasks only, all runs share the cancellation token, and
/// [`state`](Self::state) reports `Draining` while any of them is active.
pub struct BoundedRunner {
    config: RunnerConfig,
    bus: Bus,
    emitter: Emitter,
    token: CancellationToken,
    runs: Mutex<Runs>,
}

impl BoundedRunner {
    /// Creates a runner with its own event bus (`config.bus_capacity`).
    ///
    /// Fails with [`ConfigError::ZeroConcurrency`] before anything can start.
    pub fn new(config: RunnerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let bus = Bus::new(config.bus_capacity_clamped());
        Ok(Self {
            emitter: Emitter::new("runner", Some(bus.clone())),
            bus,
            config,
            token: CancellationToken::new(),
            runs: Mutex::new(Runs::default()),
        })
    }

    /// Publishes onto a shared bus instead of the runner's own.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.emitter = Emitter::new(self.emitter.source().to_owned(), Some(bus.clone()));
        self.bus = bus;
        self
    }

    /// Sets the `source` attached to published events (default: `"runner"`).
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.emitter = Emitter::new(name, Some(self.bus.clone()));
        self
    }

    /// Bus the runner publishes on.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Configuration the runner was built with.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Current lifecycle state.
    ///
    /// `Cancelled` once any run has observed cancellation, otherwise `Draining` while
    /// at least one run is active and `Idle` when none is.
    pub fn state(&self) -> RunState {
        let runs = self.runs.lock();
        if runs.cancelled {
            RunState::Cancelled
        } else if runs.active > 0 {
            RunState::Draining
        } else {
            RunState::Idle
        }
    }

    /// Stops admitting tasks. In-flight tasks finish; cancellation is permanent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Token observed by the runner; cancelling it is the same as [`cancel`](Self::cancel).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Runs all tasks, failing fast.
    ///
    /// The first error stops admission; tasks already in flight are awaited and the
    /// error is returned as [`RunError::Task`]. Results are in completion order.
    pub async fn run<I, F, Fut, T, E>(&self, tasks: I) -> Result<Vec<T>, RunError<E>>
    where
        I: IntoIterator<Item = F>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let drained = self.drive(tasks, Policy::FailFast).await;
        if let Some(TaskFailure { index, error }) = drained.failures.into_iter().next() {
            return Err(RunError::Task { index, error });
        }
        if drained.cancelled {
            return Err(RunError::Cancelled {
                completed: drained.results.len(),
                not_started: drained.not_started,
            });
        }
        Ok(drained.results)
    }

    /// Runs all tasks regardless of failures and reports every outcome.
    pub async fn run_settled<I, F, Fut, T, E>(&self, tasks: I) -> RunReport<T, E>
    where
        I: IntoIterator<Item = F>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let drained = self.drive(tasks, Policy::Settle).await;
        RunReport {
            results: drained.results,
            failures: drained.failures,
            not_started: drained.not_started,
        }
    }

    async fn drive<I, F, Fut, T, E>(&self, tasks: I, policy: Policy) -> Drained<T, E>
    where
        I: IntoIterator<Item = F>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let mut pending: VecDeque<(usize, F)> = tasks.into_iter().enumerate().collect();
        let total = pending.len();
        let mut out = Drained {
            results: Vec::with_capacity(total),
            failures: Vec::new(),
            not_started: 0,
            cancelled: false,
        };
        if total == 0 {
            return out;
        }

        let concurrency = self.config.concurrency;
        let _active = ActiveRun::enter(&self.runs);
        debug!(total, concurrency, "run started");
        self.emitter.emit_with(EventKind::RunStarted, |ev| {
            ev.with_reason(format!("total={total} concurrency={concurrency}"))
        });

        let mut running: JoinSet<(usize, Result<T, E>)> = JoinSet::new();
        let mut halted = false;

        loop {
            if !out.cancelled && !pending.is_empty() && self.token.is_cancelled() {
                out.cancelled = true;
                self.runs.lock().cancelled = true;
                debug!(not_started = pending.len(), "run cancelled");
                self.emitter.emit_with(EventKind::RunCancelled, |ev| {
                    ev.with_reason(format!("not_started={}", pending.len()))
                });
            }

            while !halted && !out.cancelled && running.len() < concurrency {
                let Some((index, task)) = pending.pop_front() else {
                    break;
                };
                let fut = task();
                running.spawn(async move { (index, fut.await) });
                trace!(index, in_flight = running.len(), "task admitted");
                self.emitter
                    .emit_with(EventKind::TaskAdmitted, |ev| ev.with_index(index));
            }

            if running.is_empty() {
                break;
            }

            tokio::select! {
                biased;

                _ = self.token.cancelled(), if !out.cancelled && !pending.is_empty() => {}
                joined = running.join_next() => {
                    match joined {
                        Some(Ok((index, Ok(value)))) => {
                            trace!(index, "task completed");
                            self.emitter
                                .emit_with(EventKind::TaskCompleted, |ev| ev.with_index(index));
                            out.results.push(value);
                        }
                        Some(Ok((index, Err(error)))) => {
                            debug!(index, "task failed");
                            self.emitter
                                .emit_with(EventKind::TaskFailed, |ev| ev.with_index(index));
                            if policy == Policy::FailFast && !halted {
                                halted = true;
                                debug!(index, queued = pending.len(), "admission stopped after failure");
                            }
                            out.failures.push(TaskFailure { index, error });
                        }
                        // Only `drive` owns the set and it never aborts, so a non-panic
                        // join error means the runtime is shutting down underneath us.
                        Some(Err(err)) => match err.try_into_panic() {
                            Ok(payload) => panic::resume_unwind(payload),
                            Err(err) => warn!(error = %err, "task aborted by runtime shutdown"),
                        },
                        None => break,
                    }
                }
            }
        }

        out.not_started = pending.len();
        debug!(
            completed = out.results.len(),
            failed = out.failures.len(),
            not_started = out.not_started,
            "run finished"
        );
        let reason = format!(
            "completed={} failed={} not_started={}",
            out.results.len(),
            out.failures.len(),
            out.not_started
        );
        self.emitter
            .emit_with(EventKind::RunFinished, |ev| ev.with_reason(reason));
        out
    }
}

/// Runs `tasks` with at most `concurrency` in flight, failing fast.
///
/// `concurrency == 0` is rejected with [`RunError::InvalidArgument`] before any task
/// starts; an empty task list resolves to `Ok(vec![])`.
pub async fn run_bounded<I, F, Fut, T, E>(tasks: I, concurrency: usize) -> Result<Vec<T>, RunError<E>>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let runner = BoundedRunner::new(RunnerConfig::with_concurrency(concurrency))?;
    runner.run(tasks).await
}
