use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Tracks which messages have a translate+render cycle running so two cycles
/// never overlap for the same message. The slot is released on success,
/// failure, or cancellation alike: the guard frees it on drop.
#[derive(Clone, Debug, Default)]
pub struct InFlightRegistry {
    inner: Arc<Mutex<HashSet<u64>>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the slot for `message_id`. Returns None when a cycle for that
    /// message is already running.
    pub fn try_begin(&self, message_id: u64) -> Option<InFlightGuard> {
        let mut set = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if set.insert(message_id) {
            Some(InFlightGuard {
                registry: Arc::clone(&self.inner),
                message_id,
            })
        } else {
            None
        }
    }

    pub fn is_in_flight(&self, message_id: u64) -> bool {
        let set = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        set.contains(&message_id)
    }
}

#[derive(Debug)]
pub struct InFlightGuard {
    registry: Arc<Mutex<HashSet<u64>>>,
    message_id: u64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut set = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        set.remove(&self.message_id);
    }
}
