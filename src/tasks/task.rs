//! # Task unit.
//!
//! [`Consumable`] wraps a zero-argument, one-shot closure that *creates* the
//! future to run. The future does not exist until a queue decides to execute
//! the task, so a queued task does no work while it waits its turn.
//!
//! ## Example
//! ```rust
//! use admission_queue::Consumable;
//!
//! let task = Consumable::new(|| async { 40 + 2 });
//! # let _ = task;
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Boxed future produced by a task unit.
pub(crate) type TaskFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

type Factory<T> = Box<dyn FnOnce() -> TaskFuture<T> + Send + 'static>;

/// Zero-argument asynchronous operation producing a `T`.
///
/// Consumed exactly once by the queue that admits it.
pub struct Consumable<T> {
    factory: Factory<T>,
}

impl<T> Consumable<T> {
    /// Wraps a closure returning a future.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        Self {
            factory: Box::new(move || Box::pin(f()) as TaskFuture<T>),
        }
    }

    /// Invokes the closure and returns the future it built.
    pub(crate) fn start(self) -> TaskFuture<T> {
        (self.factory)()
    }
}

impl<T> fmt::Debug for Consumable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumable").finish_non_exhaustive()
    }
}
