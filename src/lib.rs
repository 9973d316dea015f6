//! # pacer
//!
//! **Pacer** provides rate-control primitives for tokio applications: a debounce
//! controller, a throttle controller, and a bounded-concurrency task runner.
//!
//! Controllers wrap plain synchronous functions and decide *when* they run. The
//! runner drives async task factories and decides *how many* run at once. Both
//! report what they do as [`Event`]s on an optional [`Bus`].
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   caller ──call(args)──► Debounced / Throttled ──► f(args) (now or on timer fire)
//!                               │   state: Mutex
//!                               │   timer: Arc<dyn Timer>  (TokioTimer | ManualTimer)
//!                               ▼
//!   caller ──run(tasks)──► BoundedRunner ──► JoinSet (≤ concurrency in flight)
//!                               │
//!                               ▼ publishes
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    Bus (broadcast channel)                       │
//! └──────────────────────────────┬───────────────────────────────────┘
//!                                ▼
//!                     SubscriberSet::listen
//!                      ┌─────────┼─────────┐
//!                      ▼         ▼         ▼
//!                   worker1   worker2   workerN
//!                      ▼         ▼         ▼
//!                 sub1.on    sub2.on   subN.on
//!                  _event()   _event()  _event()
//! ```
//!
//! ### Debounce vs throttle
//! ```text
//! calls:      x x x x x         x   x x x x x x x x x x
//! debounce:             ▲(wait)         (waits for quiet)      ▲
//! throttle:   ▲         ▲       ▲         ▲         ▲         ▲
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                         |
//! |-------------------|--------------------------------------------------------------|--------------------------------------------|
//! | **Debounce**      | Collapse bursts into leading/trailing calls, `max_wait` cap. | [`Debounced`], [`DebounceOptions`]         |
//! | **Throttle**      | At most one invocation per window, latest args on trailing.  | [`Throttled`], [`ThrottleOptions`]         |
//! | **Runner**        | Bounded concurrency, FIFO admission, fail-fast or settled.   | [`BoundedRunner`], [`run_bounded`]         |
//! | **Time**          | Injectable clock; virtual time for deterministic tests.      | [`Timer`], [`TokioTimer`], [`ManualTimer`] |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, custom).       | [`Subscribe`], [`SubscriberSet`]           |
//! | **Errors**        | Typed configuration and run errors.                          | [`ConfigError`], [`RunError`]              |
//! | **Configuration** | Option structs, loadable from TOML.                          | [`Config`], [`RunnerConfig`]               |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use pacer::{DebounceOptions, ThrottleOptions, debounce, run_bounded, throttle};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Save at most once per quiet period of 200ms.
//!     let save = debounce(|doc: String| doc.len(), Duration::from_millis(200), DebounceOptions::default())?;
//!     save.call("draft".into());
//!     save.call("draft 2".into());
//!     assert_eq!(save.flush(), Some(7));
//!
//!     // Report progress at most every 100ms.
//!     let progress = throttle(|pct: u8| pct, Duration::from_millis(100), ThrottleOptions::default())?;
//!     assert_eq!(progress.call(10), Some(10));
//!     assert_eq!(progress.call(20), Some(10));
//!
//!     // Fetch with at most 4 requests in flight.
//!     let jobs = (0..16u32).map(|id| move || async move { Ok::<_, std::io::Error>(id * 2) });
//!     let results = run_bounded(jobs, 4).await?;
//!     assert_eq!(results.len(), 16);
//!     Ok(())
//! }
//! ```
mod clock;
mod config;
mod controllers;
mod error;
mod events;
mod runner;
mod subscribers;

// ---- Public re-exports ----

pub use clock::{Callback, ManualTimer, Timer, TimerHandle, TimerRef, TokioTimer};
pub use config::{Config, DebounceOptions, RunnerConfig, ThrottleOptions};
pub use controllers::{
    DebounceBuilder, Debounced, ThrottleBuilder, Throttled, debounce, throttle,
};
pub use error::{ConfigError, RunError};
pub use events::{Bus, Event, EventKind};
pub use runner::{BoundedRunner, RunReport, RunState, TaskFailure, run_bounded};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
