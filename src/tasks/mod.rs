//! # Task units and completion handles.
//!
//! This module provides the types flowing through both queues:
//! - [`Consumable`] - one-shot async task unit
//! - [`Completion`] - future handed back to the caller
//! - [`Outcome`] - lazy-queue result (completed or not admitted)

mod completion;
mod task;

pub(crate) use completion::{Resolver, channel};
pub use completion::{Completion, Outcome};
pub use task::Consumable;
