//! Scheduler status snapshot.

use std::fmt;

/// Point-in-time counts, read by the scheduler loop in one step.
///
/// - `pending`: tasks waiting in the queue
/// - `active`: handles held in the registry
/// - `in_flight`: operations started but not yet settled (`≤ max_active`)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Status {
    pub pending: usize,
    pub active: usize,
    pub in_flight: usize,
}

impl Status {
    /// True when nothing is queued, running or held.
    pub fn is_idle(&self) -> bool {
        self.pending == 0 && self.active == 0 && self.in_flight == 0
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pending={} active={} in_flight={}",
            self.pending, self.active, self.in_flight
        )
    }
}
