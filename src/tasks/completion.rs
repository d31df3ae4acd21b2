//! # Completion handles.
//!
//! Every admitted task is paired with a one-shot channel:
//! - the queue keeps the [`Resolver`] (sending half),
//! - the caller gets the [`Completion`] (receiving half, a `Future`).
//!
//! ## Rules
//! - `Resolver::resolve` takes `self`, so a handle is fulfilled at most once.
//! - A resolver dropped without being fulfilled resolves the completion with
//!   [`TaskError::Abandoned`]; a completion never hangs forever.
//! - Dropping a completion does not cancel the task; its value is discarded.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::TaskError;

/// Creates a linked resolver/completion pair.
pub(crate) fn channel<T>() -> (Resolver<T>, Completion<T>) {
    let (tx, rx) = oneshot::channel();
    (Resolver { tx }, Completion { rx })
}

/// Sending half of a completion handle, owned by the queue.
pub(crate) struct Resolver<T> {
    tx: oneshot::Sender<Result<T, TaskError>>,
}

impl<T> Resolver<T> {
    /// Fulfils the completion.
    ///
    /// Returns `false` when the caller already dropped its [`Completion`].
    pub(crate) fn resolve(self, result: Result<T, TaskError>) -> bool {
        self.send(result).is_ok()
    }

    /// Fulfils the completion, handing `result` back if the caller is gone.
    ///
    /// Lets the queue drop an unclaimed value outside its own critical section.
    pub(crate) fn send(self, result: Result<T, TaskError>) -> Result<(), Result<T, TaskError>> {
        self.tx.send(result)
    }
}

/// Future resolving to the outcome of one submitted task.
///
/// Output is `Ok(value)` once the task ran, or a [`TaskError`] when it panicked
/// or was abandoned.
#[must_use = "a completion does nothing unless awaited; the task runs regardless"]
#[derive(Debug)]
pub struct Completion<T> {
    rx: oneshot::Receiver<Result<T, TaskError>>,
}

impl<T> Completion<T> {
    /// Completion that is already resolved with `result`.
    pub(crate) fn ready(result: Result<T, TaskError>) -> Self {
        let (resolver, completion) = channel();
        resolver.resolve(result);
        completion
    }
}

impl<T> Future for Completion<T> {
    type Output = Result<T, TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or(Err(TaskError::Abandoned)))
    }
}

/// Result of a task submitted to a [`LazyQueue`](crate::LazyQueue).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The task was admitted and produced this value.
    Completed(T),
    /// The queue was busy; the task was never invoked.
    NotAdmitted,
}

impl<T> Outcome<T> {
    /// True if the task was admitted and ran.
    #[inline]
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    /// Converts into `Some(value)` for completed tasks, `None` otherwise.
    #[inline]
    pub fn into_option(self) -> Option<T> {
        match self {
            Outcome::Completed(v) => Some(v),
            Outcome::NotAdmitted => None,
        }
    }
}

impl<T> From<Outcome<T>> for Option<T> {
    fn from(outcome: Outcome<T>) -> Self {
        outcome.into_option()
    }
}
