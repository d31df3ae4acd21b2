//! # Events emitted by the queues.
//!
//! The [`EventKind`] enum classifies event types across two categories:
//! - **Execution events**: a task's path through a queue (queued, starting, completed, panicked)
//! - **Admission events**: drain loop and slot transitions, skipped or rejected submissions
//!
//! The [`Event`] struct carries metadata such as timestamps, queue name, task id
//! and execution time.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use admission_queue::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TaskCompleted)
//!     .with_queue("uploads")
//!     .with_task(3)
//!     .with_elapsed(Duration::from_millis(25));
//!
//! assert_eq!(ev.kind, EventKind::TaskCompleted);
//! assert_eq!(ev.queue.as_deref(), Some("uploads"));
//! assert_eq!(ev.elapsed_ms, Some(25));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of queue events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Execution events ===
    /// Task admitted and appended to the queue.
    ///
    /// Sets:
    /// - `queue`, `task`
    /// - `pending`: entries waiting after the append (eager queue only)
    TaskQueued,

    /// Task unit is about to be invoked.
    ///
    /// Sets:
    /// - `queue`, `task`
    TaskStarting,

    /// Task unit finished and produced a value.
    ///
    /// Sets:
    /// - `queue`, `task`
    /// - `elapsed_ms`: execution time
    TaskCompleted,

    /// Task unit panicked; its completion receives `TaskError::Panicked`.
    ///
    /// Sets:
    /// - `queue`, `task`
    /// - `elapsed_ms`: execution time until the panic
    /// - `reason`: panic message
    TaskPanicked,

    /// The caller dropped its completion before the task finished; the result was discarded.
    ///
    /// Sets:
    /// - `queue`, `task`
    ResultDiscarded,

    // === Eager queue drain loop ===
    /// A drain loop started (processing flag set).
    ///
    /// Sets:
    /// - `queue`
    DrainStarted,

    /// The drain loop found no pending entries and stopped (processing flag cleared).
    ///
    /// Sets:
    /// - `queue`
    DrainIdle,

    // === Lazy queue admission ===
    /// Task submitted while busy and resolved as not admitted.
    ///
    /// Sets:
    /// - `queue`, `task`
    /// - `reason`: id of the task holding the slot
    TaskSkipped,

    /// Task submitted while busy and refused with `QueueError::BusyQueue`.
    ///
    /// Sets:
    /// - `queue`, `task`
    /// - `reason`: id of the task holding the slot
    TaskRejected,

    /// Slot cleared after the running task's completion was fulfilled.
    ///
    /// Sets:
    /// - `queue`, `task`
    SlotReleased,
}

/// Queue event with optional metadata.
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

    /// Name of the publishing queue.
    pub queue: Option<Arc<str>>,
    /// Per-queue task id (assigned at enqueue time).
    pub task: Option<u64>,
    /// Pending entries after the event.
    pub pending: Option<usize>,
    /// Execution time in milliseconds (compact).
    pub elapsed_ms: Option<u32>,
    /// Human-readable reason (panic message, slot owner, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            queue: None,
            task: None,
            pending: None,
            elapsed_ms: None,
            reason: None,
        }
    }

    /// Attaches the queue name.
    #[inline]
    pub fn with_queue(mut self, queue: impl Into<Arc<str>>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    /// Attaches a task id.
    #[inline]
    pub fn with_task(mut self, id: u64) -> Self {
        self.task = Some(id);
        self
    }

    /// Attaches the pending entry count.
    #[inline]
    pub fn with_pending(mut self, n: usize) -> Self {
        self.pending = Some(n);
        self
    }

    /// Attaches an execution time (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.elapsed_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// True for events marking the end of a task's execution.
    #[inline]
    pub fn is_task_finished(&self) -> bool {
        matches!(self.kind, EventKind::TaskCompleted | EventKind::TaskPanicked)
    }

    /// True for submissions refused by a busy lazy queue.
    #[inline]
    pub fn is_not_admitted(&self) -> bool {
        matches!(self.kind, EventKind::TaskSkipped | EventKind::TaskRejected)
    }
}
