use std::sync::Arc;

use tokio::{runtime::Handle, sync::broadcast::error::RecvError};

use crate::{
    config::{QueueConfig, SkipPolicy},
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

use super::{EagerQueue, LazyQueue};

/// Builder for constructing a queue with optional subscribers.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use admission_queue::{LogWriter, QueueBuilder, QueueConfig, SkipPolicy, Subscribe};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
///
/// let uploads = QueueBuilder::new(QueueConfig::named("uploads"))
///     .with_subscribers(subs)
///     .eager::<u64>();
///
/// let refresh = QueueBuilder::new(QueueConfig::named("refresh").with_skip(SkipPolicy::Error))
///     .lazy::<()>();
/// # let _ = (uploads, refresh);
/// # }
/// ```
pub struct QueueBuilder {
    cfg: QueueConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    runtime: Option<Handle>,
}

/// Pieces shared by both queue kinds.
pub(super) struct Parts {
    pub(super) name: Arc<str>,
    pub(super) skip: SkipPolicy,
    pub(super) bus: Bus,
    pub(super) runtime: Handle,
}

impl QueueBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: QueueConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            runtime: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive queue events through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Runs drain loops and subscriber workers on `runtime` instead of the current one.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Builds an [`EagerQueue`].
    ///
    /// # Panics
    /// Panics when no runtime was given and this is called outside a Tokio runtime.
    pub fn eager<T: Send + 'static>(self) -> EagerQueue<T> {
        EagerQueue::from_parts(self.into_parts())
    }

    /// Builds a [`LazyQueue`] using the configured [`SkipPolicy`].
    ///
    /// # Panics
    /// Panics when no runtime was given and this is called outside a Tokio runtime.
    pub fn lazy<T: Send + 'static>(self) -> LazyQueue<T> {
        LazyQueue::from_parts(self.into_parts())
    }

    fn into_parts(self) -> Parts {
        let runtime = self.runtime.unwrap_or_else(Handle::current);
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let name: Arc<str> = Arc::from(self.cfg.name.as_ref());

        if !self.subscribers.is_empty() {
            let set = SubscriberSet::new(self.subscribers, Arc::clone(&name), &runtime);
            subscriber_listener(&bus, set, &runtime);
        }

        Parts {
            name,
            skip: self.cfg.skip,
            bus,
            runtime,
        }
    }
}

/// Forwards bus events to the subscriber set until the queue is gone.
fn subscriber_listener(bus: &Bus, mut set: SubscriberSet, runtime: &Handle) {
    let mut rx = bus.subscribe();
    runtime.spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => set.emit(&ev),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "subscriber listener lagged behind the bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
        set.shutdown().await;
    });
}
