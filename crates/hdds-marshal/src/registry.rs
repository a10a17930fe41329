// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Handle-keyed registry mapping native handles to host instances.
//!
//! Bindings need to get back from a native handle (an opaque pointer value)
//! to the host object wrapping it, e.g. when a native callback fires. The
//! registry is an ordinary value owned by whoever needs the lookup; share it
//! behind a `Mutex` when several threads resolve handles.

use std::collections::HashMap;

/// Integer form of a native handle. Zero is the null handle.
pub type Handle = usize;

#[derive(Debug)]
struct Entry<T> {
    value: T,
    refs: usize,
}

/// Map from native handle to host instance, with per-handle reference
/// counts for wrappers that hand out the same handle more than once.
#[derive(Debug)]
pub struct HandleRegistry<T> {
    entries: HashMap<Handle, Entry<T>>,
}

impl<T> Default for HandleRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HandleRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register `value` under `handle`, replacing (and returning) any
    /// previous value. The null handle is never stored.
    pub fn insert(&mut self, handle: Handle, value: T) -> Option<T> {
        if handle == 0 {
            log::debug!("[registry] ignoring insert for null handle");
            return None;
        }
        self.entries
            .insert(handle, Entry { value, refs: 1 })
            .map(|old| old.value)
    }

    pub fn find(&self, handle: Handle) -> Option<&T> {
        self.entries.get(&handle).map(|entry| &entry.value)
    }

    pub fn find_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.entries.get_mut(&handle).map(|entry| &mut entry.value)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Remove `handle` regardless of its reference count.
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        self.entries.remove(&handle).map(|entry| entry.value)
    }

    /// Register `handle` or bump its reference count if already present.
    /// `make` only runs for a new handle. Returns the new count (0 for the
    /// null handle).
    pub fn acquire(&mut self, handle: Handle, make: impl FnOnce() -> T) -> usize {
        if handle == 0 {
            return 0;
        }
        let entry = self
            .entries
            .entry(handle)
            .or_insert_with(|| Entry { value: make(), refs: 0 });
        entry.refs = entry.refs.saturating_add(1);
        entry.refs
    }

    /// Drop one reference to `handle`. The entry (returned) is removed when
    /// the last reference goes; `None` means it is still referenced or was
    /// never registered.
    pub fn release(&mut self, handle: Handle) -> Option<T> {
        let entry = self.entries.get_mut(&handle)?;
        entry.refs = entry.refs.saturating_sub(1);
        if entry.refs > 0 {
            return None;
        }
        log::trace!("[registry] handle {:#x} released", handle);
        self.remove(handle)
    }

    pub fn ref_count(&self, handle: Handle) -> usize {
        self.entries.get(&handle).map_or(0, |entry| entry.refs)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.entries.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_find_remove() {
        let mut registry = HandleRegistry::new();
        assert!(registry.insert(0x1000, "participant").is_none());
        assert_eq!(registry.find(0x1000), Some(&"participant"));
        assert!(registry.contains(0x1000));
        assert_eq!(registry.insert(0x1000, "replaced"), Some("participant"));
        assert_eq!(registry.remove(0x1000), Some("replaced"));
        assert!(registry.find(0x1000).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_null_handle_ignored() {
        let mut registry = HandleRegistry::new();
        assert!(registry.insert(0, 1).is_none());
        assert_eq!(registry.acquire(0, || 1), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_find_mut() {
        let mut registry = HandleRegistry::new();
        registry.insert(7, vec![1]);
        registry.find_mut(7).expect("registered").push(2);
        assert_eq!(registry.find(7), Some(&vec![1, 2]));
    }

    #[test]
    fn test_acquire_release_counts() {
        let mut registry = HandleRegistry::new();
        let mut built = 0;
        assert_eq!(registry.acquire(0x20, || { built += 1; "writer" }), 1);
        assert_eq!(registry.acquire(0x20, || { built += 1; "other" }), 2);
        assert_eq!(built, 1);
        assert_eq!(registry.ref_count(0x20), 2);

        assert!(registry.release(0x20).is_none());
        assert_eq!(registry.ref_count(0x20), 1);
        assert_eq!(registry.release(0x20), Some("writer"));
        assert_eq!(registry.ref_count(0x20), 0);
        assert!(registry.release(0x20).is_none());
    }

    #[test]
    fn test_handles_lists_keys() {
        let mut registry = HandleRegistry::new();
        registry.insert(1, ());
        registry.insert(2, ());
        let mut handles: Vec<_> = registry.handles().collect();
        handles.sort_unstable();
        assert_eq!(handles, vec![1, 2]);
        assert_eq!(registry.len(), 2);
    }
}
