//! # Render task abstraction.
//!
//! This module defines the [`Task`] trait: a stable identity, an opaque target
//! surface and a render operation that may produce a [`ResourceHandle`].
//! The common handle type is [`TaskRef`], an `Arc<dyn Task>` suitable for
//! sharing between the caller and the scheduler.
//!
//! The operation receives a [`CancellationToken`] that is cancelled only when
//! the scheduler shuts down. Cancel and flush never interrupt an operation
//! that has already started.

use std::{fmt, future::Future, pin::Pin, sync::Arc};

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::resource::ResourceHandle;

/// Caller-supplied identity of one logical render request.
pub type TaskId = Arc<str>;

/// Boxed future returned by [`Task::spawn`].
///
/// `Ok(Some(handle))` activates the task, `Ok(None)` drops it quietly,
/// `Err(_)` drops it and is reported as a failure.
pub type BoxTaskFuture =
    Pin<Box<dyn Future<Output = Result<Option<ResourceHandle>, TaskError>> + Send + 'static>>;

/// Shared reference to a task.
pub type TaskRef = Arc<dyn Task>;

/// Opaque reference to the surface a task renders into (e.g. a canvas id).
///
/// The scheduler carries it for events and logs and never interprets it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SurfaceRef(Arc<str>);

impl SurfaceRef {
    /// Creates a surface reference.
    pub fn new(surface: impl Into<Arc<str>>) -> Self {
        Self(surface.into())
    }

    /// Returns the surface reference as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SurfaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SurfaceRef({})", self.0)
    }
}

impl fmt::Display for SurfaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SurfaceRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SurfaceRef {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// # Render request with a scarce-resource outcome.
///
/// A `Task` has a stable [`id`](Task::id), a [`target`](Task::target) surface
/// and a [`spawn`](Task::spawn) method that creates the render operation.
/// The scheduler calls `spawn` at most once per admitted task.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use ctxvisor::{BoxTaskFuture, ResourceHandle, SurfaceRef, Task, TaskError};
///
/// struct Thumbnail {
///     surface: SurfaceRef,
/// }
///
/// impl Task for Thumbnail {
///     fn id(&self) -> &str { "thumb-42" }
///     fn target(&self) -> &SurfaceRef { &self.surface }
///
///     fn spawn(&self, _ctx: CancellationToken) -> BoxTaskFuture {
///         Box::pin(async { Ok::<Option<ResourceHandle>, TaskError>(None) })
///     }
/// }
/// ```
pub trait Task: Send + Sync + 'static {
    /// Returns the caller-supplied identity used for dedup, cancel and the registry.
    fn id(&self) -> &str;

    /// Returns the surface this task renders into.
    fn target(&self) -> &SurfaceRef;

    /// Creates the render operation.
    fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture;
}
