//! Error types used by the ctxvisor scheduler, its tasks and resources.
//!
//! This module defines four error enums:
//!
//! - [`TaskError`]: returned by a task's render operation.
//! - [`ResourceError`]: returned when a resource fails to tear down.
//! - [`SchedulerError`]: returned by the [`Scheduler`](crate::Scheduler) handle.
//! - [`RuntimeError`]: raised by the scheduler runtime itself (shutdown).
//!
//! All types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//! None of them is fatal to the scheduler loop: task and resource errors are
//! logged and published on the bus, never returned to the submitter.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the scheduler runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some operations were still in flight.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Ids of the tasks whose operation did not settle in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use ctxvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck tasks={stuck:?}")
            }
        }
    }
}

/// # Errors produced by a task's render operation.
///
/// The scheduler never retries: any error drops the task and releases its slot.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Render operation failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Operation observed scheduler shutdown and gave up.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Convenience constructor for [`TaskError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use ctxvisor::TaskError;
    ///
    /// assert_eq!(TaskError::fail("boom").as_label(), "task_failed");
    /// assert_eq!(TaskError::Canceled.as_label(), "task_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Canceled => "context cancelled".to_string(),
        }
    }
}

/// # Errors produced while tearing down a resource.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// Destruction did not complete; the underlying context may have leaked.
    #[error("destroy failed: {error}")]
    Destroy {
        /// The underlying error message.
        error: String,
    },
}

impl ResourceError {
    /// Convenience constructor for [`ResourceError::Destroy`].
    pub fn destroy(error: impl Into<String>) -> Self {
        ResourceError::Destroy {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ResourceError::Destroy { .. } => "resource_destroy_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ResourceError::Destroy { error } => format!("destroy: {error}"),
        }
    }
}

/// Error returned by the [`Scheduler`](crate::Scheduler) handle methods.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    /// Command queue is full (try again later or use async `submit`).
    #[error("command queue full")]
    Full,

    /// Scheduler loop has stopped (shutdown or runtime dropped).
    #[error("scheduler closed")]
    Closed,
}

impl SchedulerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SchedulerError::Full => "scheduler_full",
            SchedulerError::Closed => "scheduler_closed",
        }
    }
}
