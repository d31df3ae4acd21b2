//! Queue events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `EagerQueue::enqueue` and its drain loop, `LazyQueue::enqueue`
//!   and its process routine, the shared task runner.
//! - **Consumers**: `subscribe()` receivers and the listener spawned by
//!   [`QueueBuilder`](crate::QueueBuilder) (fans out to `SubscriberSet`).

mod bus;
mod event;

pub(crate) use bus::Bus;
pub use event::{Event, EventKind};
