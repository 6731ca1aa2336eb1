use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};

use crate::assets::handle::ClipHandle;

new_key_type! {
    /// Stable id of a slot in [`ClipStorage`].
    pub struct ClipKey;
}

// Internal data structure, protected by a lock.
#[derive(Default)]
struct StorageInner {
    map: SlotMap<ClipKey, ClipHandle>,
    lookup: FxHashMap<String, ClipKey>,
}

/// Thread-safe key → [`ClipHandle`] table.
///
/// A slot is inserted before its clip is populated, so concurrent requests
/// for the same key always agree on a single handle.
#[derive(Default)]
pub struct ClipStorage {
    inner: RwLock<StorageInner>,
}

impl ClipStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// [Read] Handle stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<ClipHandle> {
        let guard = self.inner.read();
        let id = guard.lookup.get(key)?;
        guard.map.get(*id).cloned()
    }

    pub fn id_of(&self, key: &str) -> Option<ClipKey> {
        self.inner.read().lookup.get(key).copied()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.read().lookup.contains_key(key)
    }

    /// [Write] Returns the handle stored under `key`, creating it with `make`
    /// when absent. The flag is `true` only for the caller that inserted.
    ///
    /// The check and the insert happen under one write lock.
    pub fn get_or_insert_with(
        &self,
        key: &str,
        make: impl FnOnce() -> ClipHandle,
    ) -> (ClipHandle, bool) {
        let mut guard = self.inner.write();
        if let Some(handle) = guard.lookup.get(key).and_then(|id| guard.map.get(*id)) {
            return (handle.clone(), false);
        }
        let handle = make();
        let id = guard.map.insert(handle.clone());
        guard.lookup.insert(key.to_string(), id);
        (handle, true)
    }

    /// [Write] Stores `handle` under `key` unless the key is taken, in which
    /// case the existing handle wins and is returned.
    pub fn insert(&self, key: &str, handle: ClipHandle) -> ClipHandle {
        self.get_or_insert_with(key, || handle).0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
