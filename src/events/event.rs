//! # Lifecycle events emitted by controllers and the bounded runner.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Controller events**: edge invocations and timer lifecycle of debounce/throttle
//! - **Runner events**: admission and completion of bounded-runner tasks
//! - **Subscriber events**: delivery problems inside the [`SubscriberSet`](crate::SubscriberSet)
//!
//! The [`Event`] struct carries metadata such as timestamps, the emitting
//! controller's name, task indices and delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use pacer::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TimerScheduled)
//!     .with_source("search-box")
//!     .with_delay(Duration::from_millis(300));
//!
//! assert_eq!(ev.kind, EventKind::TimerScheduled);
//! assert_eq!(ev.source.as_deref(), Some("search-box"));
//! assert_eq!(ev.delay_ms, Some(300));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Controller events ===
    /// The wrapped function ran on the leading edge (synchronously, inside `call`).
    ///
    /// Sets: `source`
    LeadingInvoked,

    /// The wrapped function ran on the trailing edge (timer fire or flush).
    ///
    /// Sets: `source`
    TrailingInvoked,

    /// A trailing edge was reached without invoking (trailing disabled or no pending call).
    ///
    /// Sets: `source`
    TrailingSkipped,

    /// A delayed invocation was scheduled (replacing any previous one).
    ///
    /// Sets: `source`, `delay_ms`
    TimerScheduled,

    /// `cancel()` dropped the pending call and the live timer.
    ///
    /// Sets: `source`
    Cancelled,

    /// `flush()` forced the trailing edge early.
    ///
    /// Sets: `source`
    Flushed,

    // === Runner events ===
    /// A bounded run started.
    ///
    /// Sets: `source`, `reason` (`total=<n> concurrency=<c>`)
    RunStarted,

    /// A queued task moved into the running set.
    ///
    /// Sets: `source`, `index`
    TaskAdmitted,

    /// A task completed successfully.
    ///
    /// Sets: `source`, `index`
    TaskCompleted,

    /// A task returned an error.
    ///
    /// Sets: `source`, `index`
    TaskFailed,

    /// The running set drained and the run returned.
    ///
    /// Sets: `source`, `reason` (`completed=<n> failed=<n> not_started=<n>`)
    RunFinished,

    /// Cancellation stopped admission while tasks were still queued.
    ///
    /// Sets: `source`, `reason` (`not_started=<n>`)
    RunCancelled,

    // === Subscriber events ===
    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `source` (subscriber name), `reason`
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets: `source` (subscriber name), `reason` (panic message)
    SubscriberPanicked,
}

impl EventKind {
    /// Returns a short stable label (kebab-case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::LeadingInvoked => "leading-invoked",
            EventKind::TrailingInvoked => "trailing-invoked",
            EventKind::TrailingSkipped => "trailing-skipped",
            EventKind::TimerScheduled => "timer-scheduled",
            EventKind::Cancelled => "cancelled",
            EventKind::Flushed => "flushed",
            EventKind::RunStarted => "run-started",
            EventKind::TaskAdmitted => "task-admitted",
            EventKind::TaskCompleted => "task-completed",
            EventKind::TaskFailed => "task-failed",
            EventKind::RunFinished => "run-finished",
            EventKind::RunCancelled => "run-cancelled",
            EventKind::SubscriberOverflow => "subscriber-overflow",
            EventKind::SubscriberPanicked => "subscriber-panicked",
        }
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the emitting controller, runner or subscriber.
    pub source: Option<Arc<str>>,
    /// Submission index of a runner task.
    pub index: Option<usize>,
    /// Scheduled delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable detail (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            source: None,
            index: None,
            delay_ms: None,
            reason: None,
        }
    }

    /// Attaches the emitter's name.
    #[inline]
    pub fn with_source(mut self, source: impl Into<Arc<str>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attaches a runner task index.
    #[inline]
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_source(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_source(subscriber)
            .with_reason(info)
    }

    /// True for events about subscriber delivery itself.
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::RunStarted);
        let b = Event::new(EventKind::RunFinished);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn delay_is_saturated_to_u32_millis() {
        let ev = Event::new(EventKind::TimerScheduled).with_delay(Duration::from_secs(u64::MAX / 4));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }

    #[test]
    fn subscriber_helpers_set_source_and_reason() {
        let ev = Event::subscriber_overflow("audit", "full");
        assert!(ev.is_subscriber_event());
        assert_eq!(ev.source.as_deref(), Some("audit"));
        assert_eq!(ev.reason.as_deref(), Some("full"));
        assert_eq!(ev.kind.as_label(), "subscriber-overflow");
    }
}
