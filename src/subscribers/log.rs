//! # LogWriter: render events through `tracing`
//!
//! A minimal subscriber that turns incoming [`Event`]s into `tracing` records at
//! `INFO` level. Install any `tracing` subscriber (e.g. `tracing_subscriber::fmt`)
//! to see them.
//!
//! ## Example output
//! ```text
//! INFO pacer: [timer-scheduled] source=search delay_ms=300
//! INFO pacer: [trailing-invoked] source=search
//! INFO pacer: [task-admitted] source=runner index=3
//! INFO pacer: [run-finished] source=runner reason=Some("completed=7 failed=1 not_started=0")
//! ```

use async_trait::async_trait;
use tracing::info;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let label = e.kind.as_label();
        let source = e.source.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::TimerScheduled => {
                info!(target: "pacer", "[{label}] source={source} delay_ms={:?}", e.delay_ms);
            }
            EventKind::TaskAdmitted | EventKind::TaskCompleted | EventKind::TaskFailed => {
                info!(target: "pacer", "[{label}] source={source} index={:?}", e.index);
            }
            EventKind::RunStarted
            | EventKind::RunFinished
            | EventKind::RunCancelled
            | EventKind::SubscriberOverflow
            | EventKind::SubscriberPanicked => {
                info!(target: "pacer", "[{label}] source={source} reason={:?}", e.reason);
            }
            EventKind::LeadingInvoked
            | EventKind::TrailingInvoked
            | EventKind::TrailingSkipped
            | EventKind::Cancelled
            | EventKind::Flushed => {
                info!(target: "pacer", "[{label}] source={source}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
