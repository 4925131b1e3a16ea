//! # Event subscribers for the scheduler.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the optional built-in [`LogWriter`].
//!
//! ```text
//! Event flow:
//!   scheduler loop ── publish(Event) ──► Bus ──► subscriber listener
//!                                                      │
//!                                                SubscriberSet::emit(&Event)
//!                                            ┌─────────┼─────────┐
//!                                            ▼         ▼         ▼
//!                                        LogWriter  Metrics   Custom ...
//! ```

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod log;

pub(crate) use set::panic_message;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
