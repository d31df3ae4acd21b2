//! # Admission queues.
//!
//! Two ways to serialize async work against a single logical worker:
//! - [`EagerQueue`]: every task is admitted and runs, strictly FIFO.
//! - [`LazyQueue`]: a task runs only if nothing else is running; otherwise it is skipped.
//!
//! Both implement the object-safe [`Queue`] contract and are created through
//! [`QueueBuilder`] (or the `new` shortcuts).
//!
//! ## Invariants
//! - At most one task per queue executes at any time.
//! - Queue bookkeeping happens under a mutex that is never held across an `.await`;
//!   the only suspension point is the executing task itself.
//! - Every completion handed out is fulfilled exactly once (or abandoned on runtime shutdown).

mod builder;
mod eager;
mod lazy;
mod runner;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use builder::QueueBuilder;
pub use eager::EagerQueue;
pub use lazy::LazyQueue;

use crate::{
    error::QueueError,
    tasks::{Completion, Consumable},
};

/// Common submission contract for both admission policies.
///
/// ## Example
/// ```rust
/// use admission_queue::{Consumable, EagerQueue, Queue};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let queues: Vec<Box<dyn Queue<u32, Output = u32>>> = vec![Box::new(EagerQueue::new())];
/// for q in &queues {
///     let done = q.submit(Consumable::new(|| async { 7 })).unwrap();
///     assert_eq!(done.await, Ok(7));
/// }
/// # }
/// ```
pub trait Queue<T>: Send + Sync {
    /// What the returned [`Completion`] resolves to on success.
    type Output;

    /// Submits a task unit.
    ///
    /// Never awaits the task; returns as soon as the admission decision is made.
    fn submit(&self, task: Consumable<T>) -> Result<Completion<Self::Output>, QueueError>;

    /// True while a task is executing (or, for the eager queue, while a drain loop is active).
    fn is_busy(&self) -> bool;

    /// Queue name used in events.
    fn name(&self) -> &str;
}

/// Locks queue state, recovering from poisoning.
///
/// Critical sections never run user code, so a poisoned lock still guards consistent state.
fn lock<S>(m: &Mutex<S>) -> MutexGuard<'_, S> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
