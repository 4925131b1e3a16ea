//! # Function-backed task (`TaskFn`)
//!
//! [`TaskFn`] wraps a closure `F: Fn(CancellationToken) -> Fut` together with
//! the task id and target surface, producing a fresh future per spawn.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use ctxvisor::{TaskFn, TaskRef, TaskError};
//!
//! let t: TaskRef = TaskFn::arc("mol-7", "canvas-7", |_ctx: CancellationToken| async move {
//!     // render into canvas-7 and return the context...
//!     Ok::<_, TaskError>(None)
//! });
//!
//! assert_eq!(t.id(), "mol-7");
//! assert_eq!(t.target().as_str(), "canvas-7");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::resource::ResourceHandle;
use crate::tasks::task::{BoxTaskFuture, SurfaceRef, Task};

/// Function-backed task implementation.
#[derive(Debug)]
pub struct TaskFn<F> {
    id: Cow<'static, str>,
    target: SurfaceRef,
    f: F,
}

impl<F, Fut> TaskFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<ResourceHandle>, TaskError>> + Send + 'static,
{
    /// Creates a new function-backed task.
    ///
    /// Prefer [`TaskFn::arc`] when you immediately need a [`TaskRef`](crate::TaskRef).
    pub fn new(id: impl Into<Cow<'static, str>>, target: impl Into<SurfaceRef>, f: F) -> Self {
        Self {
            id: id.into(),
            target: target.into(),
            f,
        }
    }

    /// Creates the task and returns it as a shared handle (`Arc<dyn Task>`).
    pub fn arc(id: impl Into<Cow<'static, str>>, target: impl Into<SurfaceRef>, f: F) -> Arc<Self> {
        Arc::new(Self::new(id, target, f))
    }
}

impl<F, Fut> Task for TaskFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<ResourceHandle>, TaskError>> + Send + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn target(&self) -> &SurfaceRef {
        &self.target
    }

    fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture {
        Box::pin((self.f)(ctx))
    }
}
