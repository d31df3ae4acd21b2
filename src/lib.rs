//! # admission-queue
//!
//! **admission-queue** serializes asynchronous work against a single logical
//! worker, with two admission policies:
//!
//! - [`EagerQueue`]: every task is admitted and runs, one at a time, in
//!   submission order.
//! - [`LazyQueue`]: a task runs only if the queue is idle; otherwise it is
//!   skipped (resolved as [`Outcome::NotAdmitted`]) or refused with
//!   [`QueueError::BusyQueue`].
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   caller ── enqueue(|| async { .. }) ──► Completion<T>  (returned immediately)
//!                     │
//!                     ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ EagerQueue                          │ LazyQueue                  │
//! │  Mutex { pending: VecDeque,         │  Mutex { slot: Idle |      │
//! │          processing: bool }         │          Occupied }        │
//! │  └─► one drain loop (tokio task)    │  └─► one process task      │
//! └──────────────┬──────────────────────┴────────────┬───────────────┘
//!                ▼                                   ▼
//!          run_task: invoke task unit, catch panics, publish events
//!                │                                   │
//!                └──────────► Bus (broadcast) ◄──────┘
//!                                   │
//!                  subscribe()  ◄───┴───►  listener ─► SubscriberSet
//!                                                      ├─► LogWriter
//!                                                      └─► custom Subscribe
//! ```
//!
//! ### Lifecycle (eager)
//! ```text
//! enqueue ──► push_back(entry) ──► processing? ─ no ─► spawn drain loop
//!
//! loop {
//!   ├─► pop_front ─ empty ─► clear processing, exit
//!   ├─► publish TaskStarting
//!   ├─► task().await  (panic caught ─► TaskError::Panicked)
//!   ├─► publish TaskCompleted / TaskPanicked
//!   └─► fulfil completion (dropped by caller ─► ResultDiscarded)
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                                 | Key types / traits                      |
//! |-------------------|-------------------------------------------------------------|-----------------------------------------|
//! | **Queues**        | FIFO and drop-on-busy admission behind one contract.        | [`EagerQueue`], [`LazyQueue`], [`Queue`] |
//! | **Tasks**         | One-shot async task units and their completion futures.     | [`Consumable`], [`Completion`], [`Outcome`] |
//! | **Errors**        | Typed admission and execution errors.                       | [`QueueError`], [`TaskError`]           |
//! | **Subscriber API**| Hook into queue events (logging, metrics, custom handlers). | [`Subscribe`], [`LogWriter`]            |
//! | **Configuration** | Queue name, skip policy, bus capacity.                      | [`QueueConfig`], [`SkipPolicy`]         |
//!
//! ## Example
//! ```rust
//! use admission_queue::{EagerQueue, LazyQueue, Outcome};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let saves = EagerQueue::new();
//!     let a = saves.enqueue(|| async { "saved v1" });
//!     let b = saves.enqueue(|| async { "saved v2" });
//!     assert_eq!(a.await?, "saved v1");
//!     assert_eq!(b.await?, "saved v2");
//!
//!     let refresh = LazyQueue::new(false);
//!     let first = refresh.enqueue(|| async { 1 })?;
//!     let second = refresh.enqueue(|| async { 2 })?;
//!     assert_eq!(first.await?, Outcome::Completed(1));
//!     assert_eq!(second.await?, Outcome::NotAdmitted);
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod events;
mod queues;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use config::{QueueConfig, SkipPolicy};
pub use error::{QueueError, TaskError};
pub use events::{Event, EventKind};
pub use queues::{EagerQueue, LazyQueue, Queue, QueueBuilder};
pub use subscribers::{LogWriter, Subscribe};
pub use tasks::{Completion, Consumable, Outcome};
