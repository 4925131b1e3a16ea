//! Runtime core: admission control and resource lifecycle.
//!
//! The only public API from this module is [`Scheduler`] (with its builder,
//! config and [`Status`] snapshot).
//!
//! Internal modules:
//! - [`queue`]: pending tasks, FIFO and deduplicated by id;
//! - [`registry`]: live resource handles keyed by id, explicit teardown;
//! - [`runner`]: runs one admitted operation and packages its outcome;
//! - [`actor`]: the single loop that owns queue, registry and capacity;
//! - [`scheduler`]: public handle and subscriber listener;
//! - [`builder`]: wiring of bus, subscribers and loop.

mod actor;
mod builder;
mod config;
mod queue;
mod registry;
mod runner;
mod scheduler;
mod status;

pub use builder::SchedulerBuilder;
pub use config::SchedulerConfig;
pub use scheduler::Scheduler;
pub use status::Status;
