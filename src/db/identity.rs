//! db::identity
//!
//! Identity cache: at most one live instance per store path.
//!
//! # Invariants
//!
//! - Entries are never evicted while the owning database lives
//! - [`IdentityCache::get_or_insert_with`] is atomic: concurrent callers for
//!   the same path all receive the handle that was inserted first

use std::collections::HashMap;

use parking_lot::Mutex;

use super::instance::Handle;
use crate::core::types::StorePath;

/// Map from store path to its live instance.
#[derive(Debug, Default)]
pub struct IdentityCache {
    entries: Mutex<HashMap<StorePath, Handle>>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached handle for `path`, if any.
    pub fn get(&self, path: &StorePath) -> Option<Handle> {
        self.entries.lock().get(path).cloned()
    }

    /// Return the cached handle for `path`, or insert the one built by `make`.
    ///
    /// The second element is `true` when `make` ran. `make` is called with
    /// the cache locked and must not touch the cache itself.
    pub fn get_or_insert_with(
        &self,
        path: &StorePath,
        make: impl FnOnce() -> Handle,
    ) -> (Handle, bool) {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(path) {
            return (existing.clone(), false);
        }
        let handle = make();
        entries.insert(path.clone(), handle.clone());
        (handle, true)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Cached paths, sorted.
    pub fn paths(&self) -> Vec<StorePath> {
        let mut paths: Vec<_> = self.entries.lock().keys().cloned().collect();
        paths.sort();
        paths
    }
}
