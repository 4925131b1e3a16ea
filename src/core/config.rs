//! # Scheduler configuration.
//!
//! Provides [`SchedulerConfig`], centralized settings for one scheduler instance.
//! Every value is fixed at construction; there is no runtime reconfiguration.
//!
//! ## Clamped values
//! - `max_active = 0` → treated as `1` (a scheduler that can never admit is useless)
//! - `command_capacity = 0`, `bus_capacity = 0` → treated as `1` (channels need room)

use std::time::Duration;

/// Configuration for a [`Scheduler`](crate::Scheduler).
///
/// ## Field semantics
/// - `max_active`: maximum number of operations in flight at once
/// - `command_capacity`: bounded command channel between handles and the loop
/// - `bus_capacity`: event bus ring buffer size
/// - `grace`: how long `shutdown` waits for in-flight operations
///
/// # Example
/// ```
/// use std::time::Duration;
/// use ctxvisor::SchedulerConfig;
///
/// let cfg = SchedulerConfig::default()
///     .with_max_active(2)
///     .with_grace(Duration::from_millis(500));
/// assert_eq!(cfg.max_active_clamped(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Capacity ceiling: operations started but not yet settled.
    pub max_active: usize,

    /// Capacity of the command channel.
    ///
    /// When full, `submit()` waits and `try_submit()` returns `Full`.
    pub command_capacity: usize,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers lagging more than `bus_capacity` events observe `Lagged`.
    pub bus_capacity: usize,

    /// Maximum time `shutdown` waits for in-flight operations to settle.
    pub grace: Duration,
}

impl SchedulerConfig {
    /// Sets `max_active`.
    pub fn with_max_active(mut self, max_active: usize) -> Self {
        self.max_active = max_active;
        self
    }

    /// Sets `command_capacity`.
    pub fn with_command_capacity(mut self, capacity: usize) -> Self {
        self.command_capacity = capacity;
        self
    }

    /// Sets `bus_capacity`.
    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = capacity;
        self
    }

    /// Sets `grace`.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Returns the capacity ceiling clamped to a minimum of 1.
    #[inline]
    pub fn max_active_clamped(&self) -> usize {
        self.max_active.max(1)
    }

    /// Returns the command channel capacity clamped to a minimum of 1.
    #[inline]
    pub fn command_capacity_clamped(&self) -> usize {
        self.command_capacity.max(1)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SchedulerConfig {
    /// Default configuration:
    ///
    /// - `max_active = 3` (browsers start refusing contexts well before 16)
    /// - `command_capacity = 1024`
    /// - `bus_capacity = 1024`
    /// - `grace = 5s`
    fn default() -> Self {
        Self {
            max_active: 3,
            command_capacity: 1024,
            bus_capacity: 1024,
            grace: Duration::from_secs(5),
        }
    }
}
