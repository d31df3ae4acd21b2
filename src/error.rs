//! Error types used by the queues and by task execution.
//!
//! This module defines two error enums:
//!
//! - [`QueueError`] — admission-time errors raised synchronously by `enqueue`.
//! - [`TaskError`] — failures delivered through a task's [`Completion`](crate::Completion).
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use thiserror::Error;

/// # Errors raised when a queue refuses a submission.
///
/// These are returned directly from `enqueue`; no future is produced.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The lazy queue is configured with [`SkipPolicy::Error`](crate::SkipPolicy::Error)
    /// and a task is already running.
    #[error("queue is busy")]
    BusyQueue,
}

impl QueueError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use admission_queue::QueueError;
    ///
    /// assert_eq!(QueueError::BusyQueue.as_label(), "queue_busy");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            QueueError::BusyQueue => "queue_busy",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            QueueError::BusyQueue => "a task is already running; submission skipped".to_string(),
        }
    }
}

/// # Errors delivered in place of a task's value.
///
/// The queue does not wrap values returned by a task: a task that yields
/// `Result<U, E>` hands that result to its caller untouched. `TaskError` only
/// covers outcomes where no value exists at all.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The task unit panicked while executing.
    #[error("task panicked: {reason}")]
    Panicked {
        /// Panic payload, when it was a string.
        reason: String,
    },

    /// The queue dropped the completion handle without fulfilling it.
    ///
    /// Happens when the runtime shuts down while the task is pending or running.
    #[error("task abandoned before completion")]
    Abandoned,
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use admission_queue::TaskError;
    ///
    /// let err = TaskError::Panicked { reason: "boom".into() };
    /// assert_eq!(err.as_label(), "task_panicked");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Panicked { .. } => "task_panicked",
            TaskError::Abandoned => "task_abandoned",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Panicked { reason } => format!("panic: {reason}"),
            TaskError::Abandoned => "completion handle dropped".to_string(),
        }
    }

    /// Builds a [`TaskError::Panicked`] from a `catch_unwind` payload.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let reason = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        TaskError::Panicked { reason }
    }
}
