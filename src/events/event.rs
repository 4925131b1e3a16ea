//! # Runtime events emitted by the scheduler.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Queue events**: a task entered, moved inside, or left the pending queue
//! - **Execution events**: a task was admitted and its operation settled
//! - **Resource events**: a registered handle was torn down
//! - **Runtime events**: flush, shutdown and subscriber health
//!
//! The [`Event`] struct carries additional metadata such as timestamps, task id,
//! surface, reasons and the flush generation.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use ctxvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_task("mol-3")
//!     .with_reason("shader compile error");
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.task.as_deref(), Some("mol-3"));
//! assert_eq!(ev.reason.as_deref(), Some("shader compile error"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::tasks::SurfaceRef;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Queue events ===
    /// Task appended to the pending queue.
    ///
    /// Sets: `task`, `surface`
    TaskQueued,

    /// Task replaced a queued entry with the same id and moved to the back.
    ///
    /// Sets: `task`, `surface`
    TaskRequeued,

    /// Queued task removed by `cancel` before admission.
    ///
    /// Sets: `task`
    TaskRemoved,

    // === Execution events ===
    /// Task dequeued and its operation started (holds a capacity slot).
    ///
    /// Sets: `task`, `surface`, `generation`
    TaskAdmitted,

    /// Operation produced a handle; the task is now active in the registry.
    ///
    /// Sets: `task`, `surface`, `generation`
    TaskActivated,

    /// Operation settled without a handle; nothing registered.
    ///
    /// Sets: `task`, `surface`
    TaskDropped,

    /// Operation failed or panicked; nothing registered.
    ///
    /// Sets: `task`, `surface`, `reason`
    TaskFailed,

    /// Operation produced a handle after a flush or shutdown made it stale;
    /// the handle was destroyed instead of registered.
    ///
    /// Sets: `task`, `surface`, `generation` (the admission generation)
    TaskDiscarded,

    // === Resource events ===
    /// Registered handle destroyed (cancel, flush or shutdown).
    ///
    /// Sets: `task`
    ResourceDestroyed,

    /// Handle teardown failed; the registry entry is removed regardless.
    ///
    /// Sets: `task`, `reason`
    DestroyFailed,

    // === Runtime events ===
    /// Queue cleared and every active handle destroyed.
    ///
    /// Sets: `generation` (the new generation)
    Flushed,

    /// Shutdown requested.
    ShutdownRequested,

    /// Every in-flight operation settled within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some operations were still in flight.
    ///
    /// Sets: `reason` (stuck task ids)
    GraceExceeded,

    /// Subscriber panicked during event processing.
    ///
    /// Sets: `task` (subscriber name), `reason`
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `task` (subscriber name), `reason`
    SubscriberOverflow,
}

impl EventKind {
    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::TaskQueued => "queued",
            EventKind::TaskRequeued => "requeued",
            EventKind::TaskRemoved => "removed",
            EventKind::TaskAdmitted => "admitted",
            EventKind::TaskActivated => "activated",
            EventKind::TaskDropped => "dropped",
            EventKind::TaskFailed => "failed",
            EventKind::TaskDiscarded => "discarded",
            EventKind::ResourceDestroyed => "destroyed",
            EventKind::DestroyFailed => "destroy-failed",
            EventKind::Flushed => "flushed",
            EventKind::ShutdownRequested => "shutdown-requested",
            EventKind::AllStoppedWithin => "all-stopped-within-grace",
            EventKind::GraceExceeded => "grace-exceeded",
            EventKind::SubscriberPanicked => "subscriber-panicked",
            EventKind::SubscriberOverflow => "subscriber-overflow",
        }
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Task id (or subscriber name for subscriber events).
    pub task: Option<Arc<str>>,
    /// Target surface of the task.
    pub surface: Option<SurfaceRef>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Flush generation the event refers to.
    pub generation: Option<u64>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            surface: None,
            reason: None,
            generation: None,
        }
    }

    /// Attaches a task id.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a target surface.
    #[inline]
    pub fn with_surface(mut self, surface: SurfaceRef) -> Self {
        self.surface = Some(surface);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a flush generation.
    #[inline]
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    /// True for events produced by subscriber workers themselves.
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
