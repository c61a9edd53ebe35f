//! Tracks outstanding GETs so a newer identical request supersedes a stale one.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use crate::data::{AbortController, AbortSignal};
use crate::effects::lock;

#[derive(Debug)]
struct Handle {
    id: u64,
    controller: AbortController,
}

#[derive(Debug, Default)]
struct Entries {
    next_id: u64,
    handles: HashMap<String, Handle>,
}

/// At most one live handle per key.
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    entries: Mutex<Entries>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request for `key`, aborting any request it supersedes.
    ///
    /// The returned guard deregisters on drop, whatever the outcome.
    pub fn begin(&self, key: impl Into<String>) -> InFlightGuard<'_> {
        let key = key.into();
        let controller = AbortController::new();
        let signal = controller.signal();

        let id = {
            let mut entries = lock(&self.entries);
            entries.next_id += 1;
            let id = entries.next_id;
            if let Some(previous) = entries.handles.insert(key.clone(), Handle { id, controller }) {
                previous.controller.abort();
                debug!(key = %key, "superseded in-flight request");
            }
            id
        };

        InFlightGuard {
            registry: self,
            key,
            id,
            signal,
        }
    }

    /// Abort and forget the request tracked under `key`.
    pub fn cancel(&self, key: &str) -> bool {
        let removed = lock(&self.entries).handles.remove(key);
        match removed {
            Some(handle) => {
                handle.controller.abort();
                debug!(key, "cancelled in-flight request");
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.entries).handles.contains_key(key)
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, key: &str, id: u64) {
        let mut entries = lock(&self.entries);
        if entries.handles.get(key).is_some_and(|handle| handle.id == id) {
            entries.handles.remove(key);
        }
    }
}

/// Registration of one request; removes only its own handle when dropped.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    registry: &'a InFlightRegistry,
    key: String,
    id: u64,
    signal: AbortSignal,
}

impl InFlightGuard<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Fires when this request is superseded or cancelled.
    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    pub fn is_superseded(&self) -> bool {
        self.signal.is_aborted()
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.key, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_deregisters_on_drop() {
        let registry = InFlightRegistry::new();
        {
            let _guard = registry.begin("/course");
            assert!(registry.contains("/course"));
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_second_begin_supersedes_first() {
        let registry = InFlightRegistry::new();
        let first = registry.begin("/books?page=1");
        let second = registry.begin("/books?page=1");

        assert!(first.is_superseded());
        assert!(!second.is_superseded());
        assert_eq!(registry.len(), 1);

        // the stale request settling must not drop the newer handle
        drop(first);
        assert!(registry.contains("/books?page=1"));

        drop(second);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_distinct_keys_are_independent() {
        let registry = InFlightRegistry::new();
        let a = registry.begin("/books?page=1");
        let b = registry.begin("/books?page=2");
        assert!(!a.is_superseded());
        assert!(!b.is_superseded());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_cancel() {
        let registry = InFlightRegistry::new();
        let guard = registry.begin("/resources");
        assert!(registry.cancel("/resources"));
        assert!(guard.is_superseded());
        assert!(!registry.cancel("/resources"));
        assert!(registry.is_empty());
    }
}
