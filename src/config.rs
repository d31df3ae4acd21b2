//! # Queue configuration.
//!
//! Provides [`QueueConfig`] settings shared by both queue kinds, and
//! [`SkipPolicy`] which decides what a busy [`LazyQueue`](crate::LazyQueue)
//! does with a new submission.
//!
//! ## Sentinel values
//! - `bus_capacity = 0` → clamped to 1 (a broadcast channel needs room for one event)

use std::borrow::Cow;

/// What a [`LazyQueue`](crate::LazyQueue) does with a task submitted while busy.
///
/// The skipped task unit is never invoked under either policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SkipPolicy {
    /// Return a completion that is already resolved with
    /// [`Outcome::NotAdmitted`](crate::Outcome::NotAdmitted) (default).
    ///
    /// Use when:
    /// - Only the latest state matters
    /// - Redundant work should be silently avoided
    /// - Example: "refresh" button, periodic sync triggers
    #[default]
    Resolve,

    /// Fail the `enqueue` call with [`QueueError::BusyQueue`](crate::QueueError::BusyQueue).
    ///
    /// Use when the caller must know, synchronously, that its work was refused.
    Error,
}

impl SkipPolicy {
    /// Maps the boolean `error_on_skip` switch onto a policy.
    #[inline]
    pub fn from_error_on_skip(error_on_skip: bool) -> Self {
        if error_on_skip {
            SkipPolicy::Error
        } else {
            SkipPolicy::Resolve
        }
    }
}

/// Configuration for a single queue.
///
/// ## Field semantics
/// - `name`: Label attached to every event the queue publishes
/// - `skip`: Busy behaviour of a lazy queue (ignored by the eager queue)
/// - `bus_capacity`: Event bus ring buffer size (min 1; see [`bus_capacity_clamped`](Self::bus_capacity_clamped))
#[derive(Clone, Debug)]
pub struct QueueConfig {
    /// Queue name used in events and logs.
    pub name: Cow<'static, str>,

    /// Busy-slot behaviour for [`LazyQueue`](crate::LazyQueue).
    pub skip: SkipPolicy,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers that lag behind more than `bus_capacity` events skip older items.
    pub bus_capacity: usize,
}

impl QueueConfig {
    /// Default configuration with a custom queue name.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns a new config with the given skip policy.
    pub fn with_skip(mut self, skip: SkipPolicy) -> Self {
        self.skip = skip;
        self
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for QueueConfig {
    /// Default configuration:
    ///
    /// - `name = "queue"`
    /// - `skip = SkipPolicy::Resolve` (busy submissions resolve as not admitted)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            name: Cow::Borrowed("queue"),
            skip: SkipPolicy::default(),
            bus_capacity: 1024,
        }
    }
}
