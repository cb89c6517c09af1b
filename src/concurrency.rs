//! Per-entry locking for trash operations
//!
//! Restore and purge of the same trash entry are serialized here before they
//! reach the store, so two racing restores resolve to one success and one
//! `NotFound` instead of relying on transaction conflict retries alone.
//! Operations on different entries never block each other.

use crate::types::TrashEntryId;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// Lock manager keyed by trash entry
pub struct EntryLockManager {
    locks: RwLock<HashMap<TrashEntryId, Arc<Mutex<()>>>>,
}

impl EntryLockManager {
    pub fn new() -> Self {
        Self {
            locks: RwLock::new(HashMap::new()),
        }
    }

    /// Get (or create) the lock for one entry
    pub fn get_lock(&self, id: TrashEntryId) -> Arc<Mutex<()>> {
        {
            let map = self.locks.read();
            if let Some(lock) = map.get(&id) {
                return Arc::clone(lock);
            }
        }

        // Another thread may have inserted between the read and write lock.
        let mut map = self.locks.write();
        Arc::clone(map.entry(id).or_insert_with(|| Arc::new(Mutex::new(()))))
    }

    /// Drop locks nobody holds; entries are destroyed for good once restored or purged
    pub fn release_idle(&self) -> usize {
        let mut map = self.locks.write();
        let before = map.len();
        map.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - map.len()
    }

    pub fn len(&self) -> usize {
        self.locks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EntryLockManager {
    fn default() -> Self {
        Self::new()
    }
}
