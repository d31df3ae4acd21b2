//! # Execute one task unit.
//!
//! Shared by both queues: invokes a [`Consumable`], isolates panics and publishes
//! lifecycle events to the queue's [`Bus`].
//!
//! ## Event flow
//! ```text
//! Success:
//!   publish TaskStarting → task.start().await → Ok(value) → publish TaskCompleted
//!
//! Panic (in the closure or the future):
//!   publish TaskStarting → catch_unwind → Err(payload) → publish TaskPanicked
//!                                                      → return TaskError::Panicked
//! ```
//!
//! ## Rules
//! - Always publishes **exactly one** terminal event: `TaskCompleted` or `TaskPanicked`.
//! - No timeout, no cancellation: the task runs to completion.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::Instant;

use crate::{
    error::TaskError,
    events::{Bus, Event, EventKind},
    tasks::Consumable,
};

/// Runs `task` to completion, publishing lifecycle events for task `id` of `queue`.
pub(super) async fn run_task<T>(
    task: Consumable<T>,
    queue: &Arc<str>,
    id: u64,
    bus: &Bus,
) -> Result<T, TaskError> {
    bus.publish(
        Event::new(EventKind::TaskStarting)
            .with_queue(Arc::clone(queue))
            .with_task(id),
    );

    let started = Instant::now();
    let res = AssertUnwindSafe(async move { task.start().await })
        .catch_unwind()
        .await;
    let elapsed = started.elapsed();

    match res {
        Ok(value) => {
            publish_completed(bus, queue, id, elapsed);
            Ok(value)
        }
        Err(payload) => {
            let err = TaskError::from_panic(payload);
            publish_panicked(bus, queue, id, elapsed, &err);
            Err(err)
        }
    }
}

fn publish_completed(bus: &Bus, queue: &Arc<str>, id: u64, elapsed: Duration) {
    bus.publish(
        Event::new(EventKind::TaskCompleted)
            .with_queue(Arc::clone(queue))
            .with_task(id)
            .with_elapsed(elapsed),
    );
}

fn publish_panicked(bus: &Bus, queue: &Arc<str>, id: u64, elapsed: Duration, err: &TaskError) {
    bus.publish(
        Event::new(EventKind::TaskPanicked)
            .with_queue(Arc::clone(queue))
            .with_task(id)
            .with_elapsed(elapsed)
            .with_reason(err.as_message()),
    );
}
