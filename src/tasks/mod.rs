//! # Render tasks and the resources they produce.
//!
//! This module provides the task-related types:
//! - [`Task`] - trait for a render request with identity and target surface
//! - [`TaskFn`] - function-backed task implementation
//! - [`TaskRef`] - shared reference to a task (`Arc<dyn Task>`)
//! - [`Resource`] / [`ResourceHandle`] - explicitly destroyed render contexts

mod resource;
mod task;
mod task_fn;

pub use resource::{Resource, ResourceHandle};
pub use task::{BoxTaskFuture, SurfaceRef, Task, TaskId, TaskRef};
pub use task_fn::TaskFn;
