//! Scheduler events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the scheduler loop, `ActiveRegistry` (destroy outcomes),
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the subscriber listener (fans out to `SubscriberSet`) and
//!   anyone holding a receiver from [`Scheduler::subscribe`](crate::Scheduler::subscribe).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
