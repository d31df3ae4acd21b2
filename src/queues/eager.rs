//! # EagerQueue: order-preserving admission.
//!
//! Every submitted task is admitted. Tasks run one at a time, strictly in
//! submission order; each caller's [`Completion`] resolves once its task ran.
//!
//! ## Architecture
//! ```text
//! enqueue(task) ──► lock ─► pending.push_back(entry)
//!                          └► processing was false? ─► set it, spawn drain loop
//!               ──► return Completion (never awaits the task)
//!
//! drain loop (at most one per queue):
//! loop {
//!   ├─► lock ─► pending.pop_front()
//!   │     └─ empty ─► clear processing, publish DrainIdle, exit
//!   ├─► run_task(entry.task).await      (the only suspension point)
//!   └─► entry.resolver.resolve(result)
//! }
//! ```
//!
//! ## Rules
//! - A task that panics resolves its own completion with
//!   [`TaskError::Panicked`](crate::TaskError::Panicked); draining continues with the next entry.
//! - Dropping a completion does not remove its entry; the task still runs in order.
//! - Awaiting, from inside a task, the completion of a later task on the **same**
//!   queue never finishes: that task waits for the current one.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;

use crate::{
    config::QueueConfig,
    error::QueueError,
    events::{Bus, Event, EventKind},
    tasks::{self, Completion, Consumable, Resolver},
};

use super::{Queue, QueueBuilder, builder::Parts, lock, runner::run_task};

/// Queue that runs every submitted task, one at a time, in FIFO order.
///
/// Cloning yields another handle to the same queue.
///
/// ## Example
/// ```rust
/// use admission_queue::EagerQueue;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let queue = EagerQueue::new();
/// let first = queue.enqueue(|| async { "first" });
/// let second = queue.enqueue(|| async { "second" });
///
/// assert_eq!(second.await, Ok("second"));
/// assert_eq!(first.await, Ok("first"));
/// # }
/// ```
pub struct EagerQueue<T> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    name: Arc<str>,
    bus: Bus,
    runtime: Handle,
    next_id: AtomicU64,
    state: Mutex<DrainState<T>>,
}

/// Pending sequence and processing flag; always mutated together.
struct DrainState<T> {
    pending: VecDeque<Entry<T>>,
    processing: bool,
}

struct Entry<T> {
    id: u64,
    task: Consumable<T>,
    resolver: Resolver<T>,
}

impl<T: Send + 'static> EagerQueue<T> {
    /// Creates a queue named `"eager"` on the current Tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime; use
    /// [`QueueBuilder::with_runtime`] to pass a handle explicitly.
    pub fn new() -> Self {
        QueueBuilder::new(QueueConfig::named("eager")).eager()
    }

    pub(super) fn from_parts(parts: Parts) -> Self {
        Self {
            shared: Arc::new(Shared {
                name: parts.name,
                bus: parts.bus,
                runtime: parts.runtime,
                next_id: AtomicU64::new(0),
                state: Mutex::new(DrainState {
                    pending: VecDeque::new(),
                    processing: false,
                }),
            }),
        }
    }

    /// Appends a task and returns the future of its result.
    ///
    /// Returns immediately; the task runs after every task enqueued before it.
    pub fn enqueue<F, Fut>(&self, task: F) -> Completion<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        self.admit(Consumable::new(task))
    }

    fn admit(&self, task: Consumable<T>) -> Completion<T> {
        let shared = &self.shared;
        let id = shared.next_id.fetch_add(1, Ordering::Relaxed);
        let (resolver, completion) = tasks::channel();

        let start_drain = {
            let mut state = lock(&shared.state);
            state.pending.push_back(Entry { id, task, resolver });
            shared.publish(
                Event::new(EventKind::TaskQueued)
                    .with_task(id)
                    .with_pending(state.pending.len()),
            );
            !std::mem::replace(&mut state.processing, true)
        };

        if start_drain {
            let drainer = Drainer {
                shared: Arc::clone(shared),
                finished: false,
            };
            shared.runtime.spawn(drainer.run());
        }
        completion
    }
}

impl<T> EagerQueue<T> {
    /// Number of tasks waiting to run (the executing task is not counted).
    pub fn len(&self) -> usize {
        lock(&self.shared.state).pending.len()
    }

    /// True if no task is waiting to run.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True while a drain loop is active.
    pub fn is_processing(&self) -> bool {
        lock(&self.shared.state).processing
    }

    /// Queue name used in events.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Receiver for this queue's events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.shared.bus.subscribe()
    }
}

impl<T> Clone for EagerQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> Queue<T> for EagerQueue<T> {
    type Output = T;

    fn submit(&self, task: Consumable<T>) -> Result<Completion<T>, QueueError> {
        Ok(self.admit(task))
    }

    fn is_busy(&self) -> bool {
        self.is_processing()
    }

    fn name(&self) -> &str {
        &self.shared.name
    }
}

impl<T> Shared<T> {
    fn publish(&self, ev: Event) {
        self.bus.publish(ev.with_queue(Arc::clone(&self.name)));
    }
}

/// The single active drain loop of a queue.
///
/// If the runtime drops it before the loop finishes, `Drop` clears the
/// processing flag and abandons every pending entry.
struct Drainer<T> {
    shared: Arc<Shared<T>>,
    finished: bool,
}

impl<T: Send + 'static> Drainer<T> {
    async fn run(mut self) {
        self.shared.publish(Event::new(EventKind::DrainStarted));

        loop {
            let next = {
                let mut state = lock(&self.shared.state);
                let next = state.pending.pop_front();
                if next.is_none() {
                    state.processing = false;
                    self.shared.publish(Event::new(EventKind::DrainIdle));
                }
                next
            };
            let Some(Entry { id, task, resolver }) = next else {
                break;
            };

            let result = run_task(task, &self.shared.name, id, &self.shared.bus).await;
            if !resolver.resolve(result) {
                self.shared
                    .publish(Event::new(EventKind::ResultDiscarded).with_task(id));
            }
        }

        self.finished = true;
    }
}

impl<T> Drop for Drainer<T> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let abandoned = {
            let mut state = lock(&self.shared.state);
            state.processing = false;
            std::mem::take(&mut state.pending)
        };
        if !abandoned.is_empty() {
            tracing::warn!(
                queue = &*self.shared.name,
                abandoned = abandoned.len(),
                "drain loop dropped with pending tasks"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use futures::future::join_all;
    use rand::Rng;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::time::Duration;

    fn random_delay() -> Duration {
        Duration::from_millis(rand::rng().random_range(1..=100))
    }

    async fn explode() -> u32 {
        panic!("boom")
    }

    #[tokio::test(start_paused = true)]
    async fn results_recorded_in_submission_order() {
        let queue = EagerQueue::new();
        let recorded = Arc::new(Mutex::new(Vec::new()));

        let completions: Vec<_> = (0..10)
            .map(|i| {
                let recorded = Arc::clone(&recorded);
                let delay = random_delay();
                queue.enqueue(move || async move {
                    tokio::time::sleep(delay).await;
                    recorded.lock().unwrap().push(i);
                    i
                })
            })
            .collect();

        let results = join_all(completions).await;
        assert_eq!(results, (0..10).map(Ok).collect::<Vec<_>>());
        assert_eq!(*recorded.lock().unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_runs_two_tasks_at_once() {
        let queue = EagerQueue::new();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let producers: Vec<_> = (0..4)
            .map(|_| {
                let queue = queue.clone();
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                tokio::spawn(async move {
                    let completions: Vec<_> = (0..10)
                        .map(|_| {
                            let in_flight = Arc::clone(&in_flight);
                            let peak = Arc::clone(&peak);
                            let delay = Duration::from_millis(rand::rng().random_range(1..=5));
                            queue.enqueue(move || async move {
                                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                                peak.fetch_max(now, Ordering::SeqCst);
                                tokio::time::sleep(delay).await;
                                in_flight.fetch_sub(1, Ordering::SeqCst);
                            })
                        })
                        .collect();
                    join_all(completions).await
                })
            })
            .collect();

        for producer in join_all(producers).await {
            let results = producer.expect("producer task");
            assert!(results.iter().all(Result::is_ok));
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn enqueue_does_not_wait_for_the_task() {
        let queue = EagerQueue::new();
        let started = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&started);

        let done = queue.enqueue(move || async move {
            flag.store(true, Ordering::SeqCst);
        });
        assert!(!started.load(Ordering::SeqCst));
        assert!(queue.is_processing());
        assert_eq!(queue.len(), 1);

        assert_eq!(done.await, Ok(()));
        assert!(started.load(Ordering::SeqCst));
        assert!(queue.is_empty());
        assert!(!queue.is_processing());
    }

    #[tokio::test]
    async fn panicking_task_does_not_stop_the_drain() {
        let queue = EagerQueue::new();
        let failed = queue.enqueue(explode);
        let next = queue.enqueue(|| async { 2 });

        assert_eq!(
            failed.await,
            Err(TaskError::Panicked {
                reason: "boom".into()
            })
        );
        assert_eq!(next.await, Ok(2));
    }

    #[tokio::test]
    async fn task_error_values_pass_through_untouched() {
        let queue = EagerQueue::<Result<u32, &'static str>>::new();
        let failed = queue.enqueue(|| async { Err("disk full") });
        let next = queue.enqueue(|| async { Ok(7) });

        assert_eq!(failed.await, Ok(Err("disk full")));
        assert_eq!(next.await, Ok(Ok(7)));
        assert!(!queue.is_processing());
    }

    #[tokio::test]
    async fn dropped_completion_still_runs_in_order() {
        let queue = EagerQueue::new();
        let mut events = queue.subscribe();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);

        drop(queue.enqueue(move || async move {
            flag.store(true, Ordering::SeqCst);
            1
        }));
        assert_eq!(queue.enqueue(|| async { 2 }).await, Ok(2));
        assert!(ran.load(Ordering::SeqCst));

        let mut discarded = Vec::new();
        while let Ok(ev) = events.try_recv() {
            if ev.kind == EventKind::ResultDiscarded {
                discarded.push(ev.task);
            }
        }
        assert_eq!(discarded, vec![Some(0)]);
    }

    #[tokio::test]
    async fn publishes_drain_lifecycle() {
        let queue = QueueBuilder::new(QueueConfig::named("jobs")).eager();
        let mut events = queue.subscribe();

        assert_eq!(queue.enqueue(|| async { "x" }).await, Ok("x"));

        let mut kinds = Vec::new();
        while let Ok(ev) = events.try_recv() {
            assert_eq!(ev.queue.as_deref(), Some("jobs"));
            kinds.push(ev.kind);
        }
        assert_eq!(
            kinds,
            vec![
                EventKind::TaskQueued,
                EventKind::DrainStarted,
                EventKind::TaskStarting,
                EventKind::TaskCompleted,
                EventKind::DrainIdle,
            ]
        );
    }

    #[tokio::test]
    async fn restarts_drain_after_going_idle() {
        let queue = EagerQueue::new();
        assert_eq!(queue.enqueue(|| async { 1 }).await, Ok(1));
        assert!(!queue.is_processing());

        assert_eq!(queue.enqueue(|| async { 2 }).await, Ok(2));
        assert!(!queue.is_processing());
    }

    #[test]
    fn runtime_shutdown_abandons_pending_tasks() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .expect("runtime");
        let queue = rt.block_on(async { EagerQueue::<u32>::new() });

        let first = queue.enqueue(|| async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            1
        });
        let second = queue.enqueue(|| async { 2 });
        assert!(queue.is_processing());
        drop(rt);

        assert!(!queue.is_processing());
        assert!(queue.is_empty());

        let check = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");
        check.block_on(async {
            assert_eq!(first.await, Err(TaskError::Abandoned));
            assert_eq!(second.await, Err(TaskError::Abandoned));
        });
    }
}
