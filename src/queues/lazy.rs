//! # LazyQueue: drop-on-busy admission.
//!
//! Holds at most one task. A submission is admitted only when the slot is
//! empty; otherwise the configured [`SkipPolicy`] applies and the incoming task
//! unit is never invoked.
//!
//! ## State machine
//! ```text
//!            enqueue (slot idle)
//!   Idle ─────────────────────────► Occupied { task, started_at }
//!    ▲                                   │
//!    └──── completion fulfilled ─────────┘
//!          (same critical section)
//!
//! enqueue while Occupied:
//!   SkipPolicy::Resolve ─► Ok(completion resolved with Outcome::NotAdmitted)
//!   SkipPolicy::Error   ─► Err(QueueError::BusyQueue)
//! (no state transition either way)
//! ```
//!
//! ## Rules
//! - The completion is fulfilled and the slot cleared while holding the slot
//!   lock, so a caller woken by that completion always finds the queue idle.
//! - If the process task is dropped (runtime shutdown), the lease clears the
//!   slot on drop and the completion resolves as abandoned.
//! - No queueing of refused tasks: a refusal is final.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio::time::Instant;

use crate::{
    config::{QueueConfig, SkipPolicy},
    error::{QueueError, TaskError},
    events::{Bus, Event, EventKind},
    tasks::{self, Completion, Consumable, Outcome, Resolver},
};

use super::{Queue, QueueBuilder, builder::Parts, lock, runner::run_task};

/// Queue that runs a task only when no other task is running.
///
/// Cloning yields another handle to the same queue.
///
/// ## Example
/// ```rust
/// use admission_queue::{LazyQueue, Outcome, QueueError};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), QueueError> {
/// let queue = LazyQueue::new(false);
/// let first = queue.enqueue(|| async { 1 })?;
/// let second = queue.enqueue(|| async { 2 })?;
///
/// assert_eq!(first.await, Ok(Outcome::Completed(1)));
/// assert_eq!(second.await, Ok(Outcome::NotAdmitted));
///
/// let strict = LazyQueue::new(true);
/// let _running = strict.enqueue(|| async { 1 })?;
/// assert_eq!(strict.enqueue(|| async { 2 }).unwrap_err(), QueueError::BusyQueue);
/// # Ok(())
/// # }
/// ```
pub struct LazyQueue<T> {
    shared: Arc<Shared>,
    _output: PhantomData<fn() -> T>,
}

struct Shared {
    name: Arc<str>,
    bus: Bus,
    runtime: Handle,
    skip: SkipPolicy,
    next_id: AtomicU64,
    slot: Mutex<SlotStatus>,
}

/// Status of the single execution slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotStatus {
    /// No task running, ready to admit.
    Idle,

    /// Task currently running.
    Occupied {
        /// Id of the admitted task.
        task: u64,
        /// When the task was admitted.
        started_at: Instant,
    },
}

impl<T: Send + 'static> LazyQueue<T> {
    /// Creates a queue named `"lazy"` on the current Tokio runtime.
    ///
    /// `error_on_skip` selects [`SkipPolicy::Error`] instead of the default
    /// [`SkipPolicy::Resolve`].
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime; use
    /// [`QueueBuilder::with_runtime`] to pass a handle explicitly.
    pub fn new(error_on_skip: bool) -> Self {
        let cfg =
            QueueConfig::named("lazy").with_skip(SkipPolicy::from_error_on_skip(error_on_skip));
        QueueBuilder::new(cfg).lazy()
    }

    pub(super) fn from_parts(parts: Parts) -> Self {
        Self {
            shared: Arc::new(Shared {
                name: parts.name,
                bus: parts.bus,
                runtime: parts.runtime,
                skip: parts.skip,
                next_id: AtomicU64::new(0),
                slot: Mutex::new(SlotStatus::Idle),
            }),
            _output: PhantomData,
        }
    }

    /// Runs the task if the queue is idle.
    ///
    /// While busy the task is never invoked, and depending on the skip policy this
    /// returns a completion already resolved with [`Outcome::NotAdmitted`] or
    /// fails with [`QueueError::BusyQueue`].
    pub fn enqueue<F, Fut>(&self, task: F) -> Result<Completion<Outcome<T>>, QueueError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        self.admit(Consumable::new(task))
    }

    fn admit(&self, task: Consumable<T>) -> Result<Completion<Outcome<T>>, QueueError> {
        let shared = &self.shared;
        let id = shared.next_id.fetch_add(1, Ordering::Relaxed);

        let admitted = {
            let mut slot = lock(&shared.slot);
            let current = *slot;
            match current {
                SlotStatus::Occupied { task: holder, .. } => Err(holder),
                SlotStatus::Idle => {
                    *slot = SlotStatus::Occupied {
                        task: id,
                        started_at: Instant::now(),
                    };
                    shared.publish(Event::new(EventKind::TaskQueued).with_task(id));
                    Ok(SlotLease {
                        shared: Arc::clone(shared),
                        task: id,
                        released: false,
                    })
                }
            }
        };
        let lease = match admitted {
            Ok(lease) => lease,
            Err(holder) => return self.refuse(id, holder),
        };

        let (resolver, completion) = tasks::channel();
        shared.runtime.spawn(process(lease, task, resolver));
        Ok(completion)
    }

    fn refuse(&self, id: u64, holder: u64) -> Result<Completion<Outcome<T>>, QueueError> {
        let reason = format!("slot held by task {holder}");
        match self.shared.skip {
            SkipPolicy::Resolve => {
                self.shared.publish(
                    Event::new(EventKind::TaskSkipped)
                        .with_task(id)
                        .with_reason(reason),
                );
                Ok(Completion::ready(Ok(Outcome::NotAdmitted)))
            }
            SkipPolicy::Error => {
                self.shared.publish(
                    Event::new(EventKind::TaskRejected)
                        .with_task(id)
                        .with_reason(reason),
                );
                Err(QueueError::BusyQueue)
            }
        }
    }
}

impl<T> LazyQueue<T> {
    /// True while a task holds the slot.
    pub fn is_busy(&self) -> bool {
        matches!(*lock(&self.shared.slot), SlotStatus::Occupied { .. })
    }

    /// How long the current task has been running, if any.
    pub fn busy_for(&self) -> Option<std::time::Duration> {
        match *lock(&self.shared.slot) {
            SlotStatus::Idle => None,
            SlotStatus::Occupied { started_at, .. } => Some(started_at.elapsed()),
        }
    }

    /// Configured skip policy.
    pub fn skip_policy(&self) -> SkipPolicy {
        self.shared.skip
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

impl<T> Clone for LazyQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            _output: PhantomData,
        }
    }
}

impl<T: Send + 'static> Queue<T> for LazyQueue<T> {
    type Output = Outcome<T>;

    fn submit(&self, task: Consumable<T>) -> Result<Completion<Outcome<T>>, QueueError> {
        self.admit(task)
    }

    fn is_busy(&self) -> bool {
        LazyQueue::is_busy(self)
    }

    fn name(&self) -> &str {
        &self.shared.name
    }
}

impl Shared {
    fn publish(&self, ev: Event) {
        self.bus.publish(ev.with_queue(Arc::clone(&self.name)));
    }
}

/// Ownership of the occupied slot; dropping it frees the slot.
struct SlotLease {
    shared: Arc<Shared>,
    task: u64,
    released: bool,
}

impl SlotLease {
    /// Fulfils the completion and frees the slot in one critical section.
    ///
    /// An unclaimed value is returned so it is dropped after the lock is gone.
    fn complete<T>(
        mut self,
        resolver: Resolver<Outcome<T>>,
        result: Result<Outcome<T>, TaskError>,
    ) -> Option<Result<Outcome<T>, TaskError>> {
        let shared = Arc::clone(&self.shared);
        let mut slot = lock(&shared.slot);
        let unclaimed = resolver.send(result).err();
        if unclaimed.is_some() {
            shared.publish(Event::new(EventKind::ResultDiscarded).with_task(self.task));
        }
        self.release(&mut slot);
        unclaimed
    }

    fn release(&mut self, slot: &mut SlotStatus) {
        *slot = SlotStatus::Idle;
        self.released = true;
        self.shared
            .publish(Event::new(EventKind::SlotReleased).with_task(self.task));
    }
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let shared = Arc::clone(&self.shared);
        let mut slot = lock(&shared.slot);
        self.release(&mut slot);
    }
}

/// Runs the admitted task, then fulfils its completion and releases the slot.
async fn process<T>(lease: SlotLease, task: Consumable<T>, resolver: Resolver<Outcome<T>>) {
    let result = run_task(task, &lease.shared.name, lease.task, &lease.shared.bus)
        .await
        .map(Outcome::Completed);
    drop(lease.complete(resolver, result));
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use rand::Rng;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::time::Duration;

    async fn explode() -> u32 {
        panic!("boom")
    }

    #[tokio::test(start_paused = true)]
    async fn drops_work_while_busy() {
        let queue = LazyQueue::new(false);
        let recorded = Arc::new(Mutex::new(Vec::new()));

        let completions: Vec<_> = (0..10)
            .map(|i| {
                let recorded = Arc::clone(&recorded);
                let delay = Duration::from_millis(rand::rng().random_range(1..=100));
                queue
                    .enqueue(move || async move {
                        tokio::time::sleep(delay).await;
                        recorded.lock().unwrap().push(i);
                        i
                    })
                    .expect("resolve policy never errors")
            })
            .collect();

        let outcomes = join_all(completions).await;
        assert_eq!(outcomes[0], Ok(Outcome::Completed(0)));
        assert!(
            outcomes[1..]
                .iter()
                .all(|o| *o == Ok(Outcome::NotAdmitted))
        );

        let recorded = recorded.lock().unwrap();
        assert!(recorded.len() < 10);
        assert_eq!(*recorded, vec![0]);
    }

    #[tokio::test]
    async fn error_on_skip_rejects_synchronously() {
        let queue = LazyQueue::new(true);
        assert_eq!(queue.skip_policy(), SkipPolicy::Error);

        let invoked = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&invoked);

        let first = queue.enqueue(|| async { 1 }).expect("idle queue admits");
        let refused = queue.enqueue(move || {
            flag.store(true, Ordering::SeqCst);
            async { 2 }
        });
        assert_eq!(refused.unwrap_err(), QueueError::BusyQueue);

        assert_eq!(first.await, Ok(Outcome::Completed(1)));
        assert!(!invoked.load(Ordering::SeqCst));

        let third = queue.enqueue(|| async { 3 }).expect("slot released");
        assert_eq!(third.await, Ok(Outcome::Completed(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn slot_is_released_after_completion() {
        let queue = LazyQueue::new(false);
        assert!(!queue.is_busy());
        assert_eq!(queue.busy_for(), None);

        let running = queue
            .enqueue(|| async {
                tokio::time::sleep(Duration::from_millis(50)).await;
            })
            .expect("admitted");
        assert!(queue.is_busy());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(
            queue
                .busy_for()
                .is_some_and(|d| d >= Duration::from_millis(20))
        );

        assert_eq!(running.await, Ok(Outcome::Completed(())));
        assert!(!queue.is_busy());
    }

    #[tokio::test]
    async fn panicking_task_releases_the_slot() {
        let queue = LazyQueue::new(true);
        let failed = queue.enqueue(explode).expect("admitted");
        assert_eq!(
            failed.await,
            Err(TaskError::Panicked {
                reason: "boom".into()
            })
        );

        let next = queue.enqueue(|| async { 5 }).expect("slot released");
        assert_eq!(next.await, Ok(Outcome::Completed(5)));
    }

    #[tokio::test]
    async fn refusals_name_the_slot_holder() {
        let queue = QueueBuilder::new(QueueConfig::named("refresh")).lazy();
        let mut events = queue.subscribe();

        let running = queue.enqueue(|| async {}).expect("admitted");
        let skipped = queue.enqueue(|| async {}).expect("resolve policy");
        assert_eq!(skipped.await, Ok(Outcome::NotAdmitted));
        assert_eq!(running.await, Ok(Outcome::Completed(())));

        let mut seen = Vec::new();
        while let Ok(ev) = events.try_recv() {
            seen.push((ev.kind, ev.task));
            if ev.kind == EventKind::TaskSkipped {
                assert_eq!(ev.reason.as_deref(), Some("slot held by task 0"));
            }
        }
        assert_eq!(
            seen,
            vec![
                (EventKind::TaskQueued, Some(0)),
                (EventKind::TaskSkipped, Some(1)),
                (EventKind::TaskStarting, Some(0)),
                (EventKind::TaskCompleted, Some(0)),
                (EventKind::SlotReleased, Some(0)),
            ]
        );
    }

    #[tokio::test]
    async fn dropped_completion_discards_then_releases() {
        let queue = LazyQueue::new(true);
        let mut events = queue.subscribe();

        drop(queue.enqueue(|| async { 1 }).expect("admitted"));
        while queue.is_busy() {
            tokio::task::yield_now().await;
        }

        let mut tail = Vec::new();
        while let Ok(ev) = events.try_recv() {
            tail.push(ev.kind);
        }
        assert_eq!(
            &tail[tail.len() - 2..],
            &[EventKind::ResultDiscarded, EventKind::SlotReleased]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn awaited_completion_leaves_the_queue_idle() {
        let queue = LazyQueue::new(true);
        for round in 0..500u32 {
            let done = queue
                .enqueue(move || async move { round })
                .unwrap_or_else(|e| panic!("round {round} refused after previous await: {e}"));
            assert_eq!(done.await, Ok(Outcome::Completed(round)));
        }
        assert!(!queue.is_busy());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_submitters_never_overlap() {
        let queue = LazyQueue::<()>::new(false);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let producers: Vec<_> = (0..4)
            .map(|_| {
                let queue = queue.clone();
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                tokio::spawn(async move {
                    let mut ran = 0usize;
                    for _ in 0..25 {
                        let in_flight = Arc::clone(&in_flight);
                        let peak = Arc::clone(&peak);
                        let done = queue
                            .enqueue(move || async move {
                                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                                peak.fetch_max(now, Ordering::SeqCst);
                                tokio::time::sleep(Duration::from_millis(1)).await;
                                in_flight.fetch_sub(1, Ordering::SeqCst);
                            })
                            .expect("resolve policy never errors");
                        if done.await.expect("ran or skipped").is_completed() {
                            ran += 1;
                        }
                    }
                    ran
                })
            })
            .collect();

        let mut ran = 0;
        for producer in join_all(producers).await {
            ran += producer.expect("producer task");
        }
        assert!(ran >= 1);
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert!(!queue.is_busy());
    }

    #[test]
    fn runtime_shutdown_releases_the_slot() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");
        let queue = rt.block_on(async { LazyQueue::<u32>::new(true) });

        let pending = queue.enqueue(|| async { 1 }).expect("admitted");
        assert!(queue.is_busy());
        drop(rt);
        assert!(!queue.is_busy());

        let check = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");
        assert_eq!(check.block_on(pending), Err(TaskError::Abandoned));
    }
}
