//! # Per-queue subscriber fan-out.
//!
//! A [`SubscriberSet`] belongs to exactly one queue. The builder's listener
//! hands it every event the queue publishes; each subscriber gets its own
//! bounded inbox and worker, so a slow `on_event` never holds up the drain
//! loop or its neighbours.
//!
//! ```text
//!   listener ─► SubscriberSet::emit(&Event)
//!                   ├─► inbox(log)    ─► worker ─► LogWriter::on_event
//!                   └─► inbox(custom) ─► worker ─► Custom::on_event
//! ```
//!
//! An event that finds an inbox full is dropped for that subscriber only. The
//! number of drops is reported once, when the queue goes away.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::{
    runtime::Handle,
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
};

use crate::events::Event;

use super::Subscribe;

/// Inbox and worker of one subscriber.
struct Worker {
    subscriber: &'static str,
    inbox: mpsc::Sender<Arc<Event>>,
    handle: JoinHandle<()>,
    dropped: u64,
}

/// Fan-out of one queue's events to its subscribers.
pub(crate) struct SubscriberSet {
    queue: Arc<str>,
    workers: Vec<Worker>,
}

impl SubscriberSet {
    /// Spawns one worker per subscriber of `queue` on `runtime`.
    pub(crate) fn new(subs: Vec<Arc<dyn Subscribe>>, queue: Arc<str>, runtime: &Handle) -> Self {
        let workers = subs
            .into_iter()
            .map(|sub| spawn_worker(sub, &queue, runtime))
            .collect();
        Self { queue, workers }
    }

    /// Offers `event` to every subscriber inbox without waiting.
    pub(crate) fn emit(&mut self, event: &Event) {
        let shared = Arc::new(event.clone());
        for worker in &mut self.workers {
            match worker.inbox.try_send(Arc::clone(&shared)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    worker.dropped += 1;
                    tracing::debug!(
                        queue = &*self.queue,
                        subscriber = worker.subscriber,
                        seq = shared.seq,
                        "subscriber inbox full, event dropped"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    worker.dropped += 1;
                }
            }
        }
    }

    /// Closes every inbox and waits for the workers to drain what they hold.
    pub(crate) async fn shutdown(self) {
        for Worker {
            subscriber,
            inbox,
            handle,
            dropped,
        } in self.workers
        {
            drop(inbox);
            if handle.await.is_err() {
                tracing::warn!(queue = &*self.queue, subscriber, "subscriber worker aborted");
            }
            if dropped > 0 {
                tracing::warn!(
                    queue = &*self.queue,
                    subscriber,
                    dropped,
                    "subscriber missed events"
                );
            }
        }
    }
}

fn spawn_worker(sub: Arc<dyn Subscribe>, queue: &Arc<str>, runtime: &Handle) -> Worker {
    let subscriber = sub.name();
    let (inbox, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
    let queue = Arc::clone(queue);

    let handle = runtime.spawn(async move {
        while let Some(ev) = rx.recv().await {
            let delivered = AssertUnwindSafe(sub.on_event(&ev)).catch_unwind().await;
            if delivered.is_err() {
                tracing::warn!(
                    queue = &*queue,
                    subscriber,
                    seq = ev.seq,
                    "subscriber panicked while handling event"
                );
            }
        }
    });

    Worker {
        subscriber,
        inbox,
        handle,
        dropped: 0,
    }
}
