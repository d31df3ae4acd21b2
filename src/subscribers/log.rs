//! # LogWriter — structured event logger
//!
//! A subscriber that turns every incoming [`Event`] into a `tracing` record.
//! Install any `tracing` subscriber (e.g. `tracing_subscriber::fmt`) to see them.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO queued queue="uploads" task=3 pending=2
//! DEBUG starting queue="uploads" task=3
//! INFO completed queue="uploads" task=3 elapsed_ms=41
//! WARN panicked queue="uploads" task=4 reason="boom"
//! INFO skipped queue="refresh" task=9 reason="slot held by task 8"
//! ```

use async_trait::async_trait;

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
        let queue = e.queue.as_deref().unwrap_or("unknown");
        match e.kind {
            EventKind::TaskQueued => {
                tracing::info!(queue, task = e.task, pending = e.pending, "queued");
            }
            EventKind::TaskStarting => {
                tracing::debug!(queue, task = e.task, "starting");
            }
            EventKind::TaskCompleted => {
                tracing::info!(queue, task = e.task, elapsed_ms = e.elapsed_ms, "completed");
            }
            EventKind::TaskPanicked => {
                tracing::warn!(
                    queue,
                    task = e.task,
                    elapsed_ms = e.elapsed_ms,
                    reason = e.reason.as_deref(),
                    "panicked"
                );
            }
            EventKind::ResultDiscarded => {
                tracing::debug!(queue, task = e.task, "result discarded");
            }
            EventKind::DrainStarted => {
                tracing::debug!(queue, "drain started");
            }
            EventKind::DrainIdle => {
                tracing::debug!(queue, "drain idle");
            }
            EventKind::TaskSkipped => {
                tracing::info!(queue, task = e.task, reason = e.reason.as_deref(), "skipped");
            }
            EventKind::TaskRejected => {
                tracing::warn!(queue, task = e.task, reason = e.reason.as_deref(), "rejected");
            }
            EventKind::SlotReleased => {
                tracing::debug!(queue, task = e.task, "slot released");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
