//! # Run one admitted task's operation.
//!
//! Executes the render operation exactly once and packages the outcome into a
//! [`Completion`] for the scheduler loop. Nothing here touches scheduler state:
//! the future runs on its own tokio task and only its result crosses back.
//!
//! ```text
//! task.spawn(ctx) ─┬─ Ok(Some(handle)) ─► Completion { outcome: Ok(Some) }
//!                  ├─ Ok(None)         ─► Completion { outcome: Ok(None) }
//!                  ├─ Err(e)           ─► Completion { outcome: Err(e) }
//!                  └─ panic            ─► Completion { outcome: Err(Fail("operation panicked: ..")) }
//! ```

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::subscribers::panic_message;
use crate::tasks::{ResourceHandle, SurfaceRef, TaskId, TaskRef};

/// Settled operation, reconciled by the scheduler loop.
pub(crate) struct Completion {
    pub id: TaskId,
    pub surface: SurfaceRef,
    /// Flush generation at admission time.
    pub generation: u64,
    pub outcome: Result<Option<ResourceHandle>, TaskError>,
}

/// Runs `task`'s operation once; panics are mapped to [`TaskError::Fail`].
pub(crate) async fn run_once(
    task: TaskRef,
    generation: u64,
    ctx: CancellationToken,
) -> Completion {
    let t = &task;
    let outcome = match AssertUnwindSafe(async move { t.spawn(ctx).await })
        .catch_unwind()
        .await
    {
        Ok(res) => res,
        Err(panic_err) => Err(TaskError::fail(format!(
            "operation panicked: {}",
            panic_message(panic_err.as_ref())
        ))),
    };

    Completion {
        id: TaskId::from(task.id()),
        surface: task.target().clone(),
        generation,
        outcome,
    }
}
