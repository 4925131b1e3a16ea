//! # Active registry: live resource handles keyed by task id.
//!
//! ## Rules
//! - One entry per active task; an entry exists only after the operation
//!   produced a handle.
//! - The entry is removed **before** `destroy` is called, in the same step,
//!   so a handle being torn down is never reachable again.
//! - Destruction errors and panics are logged and published as
//!   `DestroyFailed`; they never propagate and never keep the entry alive.
//!
//! ```text
//! register(id, h) ──► map[id] = h   (previous handle, if any, destroyed)
//! destroy(id)     ──► take map[id] ──► h.destroy() ──► ResourceDestroyed | DestroyFailed
//! destroy_all()   ──► drain map    ──► destroy each
//! ```

use std::collections::HashMap;

use crate::error::ResourceError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::panic_message;
use crate::tasks::{ResourceHandle, TaskId};

/// Registry of live handles, owned by the scheduler loop.
pub(crate) struct ActiveRegistry {
    handles: HashMap<TaskId, ResourceHandle>,
    bus: Bus,
}

impl ActiveRegistry {
    pub fn new(bus: Bus) -> Self {
        Self {
            handles: HashMap::new(),
            bus,
        }
    }

    /// Inserts the handle for `id`.
    ///
    /// An existing handle under the same id is destroyed rather than leaked.
    pub fn register(&mut self, id: TaskId, handle: ResourceHandle) {
        if let Some(previous) = self.handles.insert(id.clone(), handle) {
            tracing::debug!(task = %id, "replacing active handle");
            let _ = destroy_handle(&self.bus, &id, previous);
        }
    }

    /// Destroys and removes the handle for `id`. `None` if absent.
    pub fn destroy(&mut self, id: &str) -> Option<Result<(), ResourceError>> {
        let (id, handle) = self.handles.remove_entry(id)?;
        Some(destroy_handle(&self.bus, &id, handle))
    }

    /// Destroys every handle and leaves the registry empty.
    ///
    /// Returns how many handles were torn down (failed teardowns included).
    pub fn destroy_all(&mut self) -> usize {
        let drained: Vec<_> = self.handles.drain().collect();
        let n = drained.len();
        for (id, handle) in drained {
            let _ = destroy_handle(&self.bus, &id, handle);
        }
        n
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Sorted list of active ids.
    #[cfg(test)]
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.handles.keys().map(|k| k.to_string()).collect();
        ids.sort_unstable();
        ids
    }
}

/// Tears down one handle, catching errors and panics.
pub(crate) fn destroy_handle(
    bus: &Bus,
    id: &str,
    mut handle: ResourceHandle,
) -> Result<(), ResourceError> {
    let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handle.destroy()))
        .unwrap_or_else(|panic_err| {
            Err(ResourceError::destroy(format!(
                "destroy panicked: {}",
                panic_message(panic_err.as_ref())
            )))
        });

    match &res {
        Ok(()) => {
            tracing::debug!(task = %id, "resource destroyed");
            bus.publish(Event::new(EventKind::ResourceDestroyed).with_task(id));
        }
        Err(e) => {
            tracing::warn!(task = %id, error = %e, "resource teardown failed");
            bus.publish(
                Event::new(EventKind::DestroyFailed)
                    .with_task(id)
                    .with_reason(e.as_message()),
            );
        }
    }
    res
}
