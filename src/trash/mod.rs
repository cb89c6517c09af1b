//! Trash Store
//!
//! Owns the soft-delete lifecycle: snapshotting a node (and its subtree) into
//! trash entries atomically with its removal from the namespace, per-user
//! listing and size accounting, and permanent purge.

pub mod restore;
pub mod sweeper;

use crate::error::FsError;
use crate::index::PathIndex;
use crate::logging::AUDIT_TARGET;
use crate::nodes::detach_subtree;
use crate::path;
use crate::store::persistence::SledFsStore;
use crate::store::{FsRead, TrashEntry};
use crate::types::{NodeId, TrashEntryId};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

pub use restore::{RestoreOutcome, RestoreResolver};
pub use sweeper::{ExpiredTrash, ExpirySweeper, SweepReport, SweeperHandle, SweeperState};

pub const DEFAULT_RETENTION_DAYS: u32 = 30;
/// Upper bound on configurable retention, one century
pub const MAX_RETENTION_DAYS: u32 = 36_500;
pub const DEFAULT_MAX_RESTORE_ATTEMPTS: u32 = 1000;
pub const DEFAULT_HOME_ROOT: &str = "/home";

/// Runtime knobs of the trash lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashSettings {
    pub retention: Duration,
    pub max_restore_attempts: u32,
    /// Parent of per-user home directories, used as the restore fallback
    pub home_root: String,
    /// Revive the original node id on restore instead of minting a new one
    pub preserve_identity: bool,
}

impl Default for TrashSettings {
    fn default() -> Self {
        Self {
            retention: Duration::days(DEFAULT_RETENTION_DAYS as i64),
            max_restore_attempts: DEFAULT_MAX_RESTORE_ATTEMPTS,
            home_root: DEFAULT_HOME_ROOT.to_string(),
            preserve_identity: false,
        }
    }
}

#[derive(Clone)]
pub struct TrashStore {
    store: Arc<SledFsStore>,
    settings: TrashSettings,
}

impl TrashStore {
    pub fn new(store: Arc<SledFsStore>, settings: TrashSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &TrashSettings {
        &self.settings
    }

    pub fn get(&self, id: TrashEntryId) -> Result<TrashEntry, FsError> {
        self.store
            .trash_entry(id)?
            .ok_or_else(|| FsError::NotFound(format!("trash entry {}", id)))
    }

    pub fn move_to_trash(&self, node_id: NodeId, deleted_by: &str) -> Result<TrashEntry, FsError> {
        self.move_to_trash_at(node_id, deleted_by, Utc::now())
    }

    /// Detach the node's subtree and record one entry per removed node, atomically
    pub fn move_to_trash_at(
        &self,
        node_id: NodeId,
        deleted_by: &str,
        now: DateTime<Utc>,
    ) -> Result<TrashEntry, FsError> {
        let deleted_by = path::validate_user(deleted_by)?;
        // Index keys carry millisecond precision.
        let now = DateTime::<Utc>::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now);
        let expires_at = now.checked_add_signed(self.settings.retention).ok_or_else(|| {
            FsError::ConfigError(format!(
                "retention of {} days overflows the expiry time",
                self.settings.retention.num_days()
            ))
        })?;

        let entries = self.store.transaction(|tx| {
            let root = tx
                .node(node_id)?
                .ok_or_else(|| FsError::NotFound(format!("node {}", node_id)))?;
            let removed = detach_subtree(tx, root)?;

            let mut entries: Vec<TrashEntry> = Vec::with_capacity(removed.len());
            let mut dir_entries: HashMap<String, usize> = HashMap::new();
            let batch_id = TrashEntryId(tx.generate_id()?);

            for (pos, node) in removed.into_iter().enumerate() {
                let id = if pos == 0 {
                    batch_id
                } else {
                    TrashEntryId(tx.generate_id()?)
                };
                // Pre-order guarantees the enclosing directory was recorded first.
                let parent_entry = if pos == 0 {
                    None
                } else {
                    dir_entries.get(&node.parent_path).copied()
                };
                if let Some(parent_pos) = parent_entry {
                    entries[parent_pos].children.push(id);
                }
                if node.is_dir() {
                    dir_entries.insert(node.path(), pos);
                }
                entries.push(TrashEntry {
                    id,
                    original_node_id: node.id,
                    name: node.name,
                    kind: node.kind,
                    original_parent_path: node.parent_path,
                    permissions: node.permissions,
                    owner: node.owner,
                    created_at: node.created_at,
                    modified_at: node.modified_at,
                    user: deleted_by.to_string(),
                    deleted_by: deleted_by.to_string(),
                    deleted_at: now,
                    expires_at,
                    batch_id,
                    parent_entry: parent_entry.map(|p| entries[p].id),
                    children: Vec::new(),
                });
            }

            for entry in &entries {
                tx.put_trash(entry)?;
            }
            Ok(entries)
        })?;

        let count = entries.len();
        let root = entries
            .into_iter()
            .next()
            .ok_or_else(|| FsError::NotFound(format!("node {}", node_id)))?;
        info!(
            node_id = %node_id,
            trash_id = %root.id,
            path = %root.original_path(),
            user = %deleted_by,
            entries = count,
            expires_at = %root.expires_at,
            "Moved to trash"
        );
        Ok(root)
    }

    /// One user's entries, most recently deleted first
    pub fn list_for_user(&self, user: &str, limit: Option<usize>) -> Result<Vec<TrashEntry>, FsError> {
        let mut entries = self.entries_for_user(user)?;
        entries.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at).then(b.id.cmp(&a.id)));
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        Ok(entries)
    }

    pub fn total_size_for_user(&self, user: &str) -> Result<u64, FsError> {
        Ok(self.entries_for_user(user)?.iter().map(TrashEntry::size).sum())
    }

    pub fn count_for_user(&self, user: &str) -> Result<usize, FsError> {
        Ok(self.store.trash_index_for_user(user)?.len())
    }

    fn entries_for_user(&self, user: &str) -> Result<Vec<TrashEntry>, FsError> {
        let mut entries = Vec::new();
        for key in self.store.trash_index_for_user(user)? {
            // Entries purged since the index scan are simply skipped.
            if let Some(entry) = self.store.trash_entry(key.id)? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    /// Permanently destroy one entry
    ///
    /// Returns `false` when the entry is already gone; a repeated purge is not an error.
    pub fn purge(&self, id: TrashEntryId) -> Result<bool, FsError> {
        self.purge_where(id, |_| true)
    }

    /// Purge only if the entry belongs to `user`; foreign entries count as absent
    pub fn purge_for_user(&self, id: TrashEntryId, user: &str) -> Result<bool, FsError> {
        self.purge_where(id, |entry| entry.user == user)
    }

    /// Purge only if the entry has expired by `now`
    pub fn purge_if_expired(&self, id: TrashEntryId, now: DateTime<Utc>) -> Result<bool, FsError> {
        self.purge_where(id, |entry| entry.is_expired(now))
    }

    fn purge_where<P>(&self, id: TrashEntryId, predicate: P) -> Result<bool, FsError>
    where
        P: Fn(&TrashEntry) -> bool,
    {
        let purged = self.store.transaction(|tx| match tx.trash_entry(id)? {
            Some(entry) if predicate(&entry) => {
                tx.remove_trash(&entry)?;
                Ok(Some(entry))
            }
            _ => Ok(None),
        })?;

        match purged {
            Some(entry) => {
                audit_purge(&entry, "purge");
                Ok(true)
            }
            None => {
                debug!(trash_id = %id, "Purge skipped, entry not present");
                Ok(false)
            }
        }
    }

    /// Empty a user's trash in one transaction; returns how many entries were removed
    pub fn purge_all_for_user(&self, user: &str) -> Result<usize, FsError> {
        let keys = self.store.trash_index_for_user(user)?;
        let purged = self.store.transaction(|tx| {
            let mut purged = Vec::new();
            for key in &keys {
                if let Some(entry) = tx.trash_entry(key.id)? {
                    tx.remove_trash(&entry)?;
                    purged.push(entry);
                }
            }
            Ok(purged)
        })?;

        for entry in &purged {
            audit_purge(entry, "empty");
        }
        info!(user = %user, count = purged.len(), "Emptied trash");
        Ok(purged.len())
    }

    /// Ids of entries (any user) whose expiry is at or before `now`
    pub fn expired_ids(&self, now: DateTime<Utc>) -> Result<Vec<TrashEntryId>, FsError> {
        Ok(self
            .store
            .trash_index_all()?
            .into_iter()
            .filter(|key| key.expires_at <= now)
            .map(|key| key.id)
            .collect())
    }

    /// Whether a live node currently sits at the entry's original location
    pub fn original_location_taken(&self, entry: &TrashEntry) -> Result<bool, FsError> {
        PathIndex::new(self.store.as_ref()).exists(&entry.original_parent_path, &entry.name)
    }
}

fn audit_purge(entry: &TrashEntry, reason: &str) {
    info!(
        target: AUDIT_TARGET,
        trash_id = %entry.id,
        user = %entry.user,
        path = %entry.original_path(),
        size = entry.size(),
        reason,
        "Permanently deleted"
    );
}
