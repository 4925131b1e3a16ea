//! # LogWriter: event logger
//!
//! A minimal subscriber that writes incoming [`Event`]s as `tracing` records.
//! Install any `tracing` subscriber (e.g. `tracing-subscriber`) to see them.
//!
//! ## Example output
//! ```text
//! INFO ctxvisor: [queued] task="mol-1" surface="canvas-1"
//! INFO ctxvisor: [admitted] task="mol-1" generation=0
//! WARN ctxvisor: [failed] task="mol-2" err="shader compile error"
//! INFO ctxvisor: [flushed] generation=1
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;
use async_trait::async_trait;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let label = e.kind.as_label();
        let task = e.task.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::TaskQueued | EventKind::TaskRequeued => {
                tracing::info!(target: "ctxvisor", "[{label}] task={task:?} surface={:?}", e.surface);
            }
            EventKind::TaskAdmitted | EventKind::TaskActivated | EventKind::TaskDiscarded => {
                tracing::info!(target: "ctxvisor", "[{label}] task={task:?} generation={:?}", e.generation);
            }
            EventKind::TaskRemoved | EventKind::TaskDropped | EventKind::ResourceDestroyed => {
                tracing::info!(target: "ctxvisor", "[{label}] task={task:?}");
            }
            EventKind::TaskFailed | EventKind::DestroyFailed => {
                tracing::warn!(target: "ctxvisor", "[{label}] task={task:?} err={:?}", e.reason);
            }
            EventKind::Flushed => {
                tracing::info!(target: "ctxvisor", "[{label}] generation={:?}", e.generation);
            }
            EventKind::ShutdownRequested | EventKind::AllStoppedWithin => {
                tracing::info!(target: "ctxvisor", "[{label}]");
            }
            EventKind::GraceExceeded => {
                tracing::warn!(target: "ctxvisor", "[{label}] stuck={:?}", e.reason);
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                tracing::warn!(target: "ctxvisor", "[{label}] subscriber={task} info={:?}", e.reason);
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
