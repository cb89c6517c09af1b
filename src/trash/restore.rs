//! Restore Resolver
//!
//! Turns a trash entry back into a live node. The target directory falls back to
//! the user's home (then the root) when the original parent is gone, and the name
//! is disambiguated as `name (n)` when the original slot is taken.

use super::TrashSettings;
use crate::error::FsError;
use crate::index::PathIndex;
use crate::nodes::{insert_node, NodeDraft};
use crate::path::{self, ROOT};
use crate::store::persistence::{SledFsStore, TxResult, TxView};
use crate::store::{FsRead, Node, TrashEntry};
use crate::types::{NodeId, TrashEntryId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// What a restore did, so the caller can tell the user about renames
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreOutcome {
    pub trash_id: TrashEntryId,
    pub node_id: NodeId,
    pub original_name: String,
    pub final_name: String,
    pub final_path: String,
    /// The name had to be disambiguated
    pub renamed: bool,
    /// The original parent was gone and a fallback directory was used
    pub relocated: bool,
    /// Entries converted back to live nodes, including descendants
    pub restored_entries: usize,
}

#[derive(Clone)]
pub struct RestoreResolver {
    store: Arc<SledFsStore>,
    settings: TrashSettings,
}

impl RestoreResolver {
    pub fn new(store: Arc<SledFsStore>, settings: TrashSettings) -> Self {
        Self { store, settings }
    }

    pub fn restore(&self, id: TrashEntryId, user: &str) -> Result<RestoreOutcome, FsError> {
        self.restore_at(id, user, Utc::now())
    }

    /// Restore `id` (and, for a directory, its batch descendants) in one transaction
    ///
    /// An entry that is gone, or that belongs to another user, is `NotFound`.
    pub fn restore_at(
        &self,
        id: TrashEntryId,
        user: &str,
        now: DateTime<Utc>,
    ) -> Result<RestoreOutcome, FsError> {
        let outcome = self.store.transaction(|tx| {
            let entry = match tx.trash_entry(id)? {
                Some(entry) if entry.user == user => entry,
                _ => return Err(FsError::NotFound(format!("trash entry {}", id)).into()),
            };

            let index = PathIndex::new(tx);
            let (target, relocated) = self.target_dir(&index, &entry)?;
            let final_name = free_name(&index, &target, &entry, self.settings.max_restore_attempts)?;

            let node = self.revive(tx, &entry, &target, &final_name, now)?;
            let mut restored = 1;

            // Descendants keep their own names; the new directory starts out empty.
            let mut pending: Vec<(TrashEntryId, String)> = entry
                .children
                .iter()
                .map(|child| (*child, node.path()))
                .collect();
            while let Some((child_id, parent)) = pending.pop() {
                let Some(child) = tx.trash_entry(child_id)? else {
                    continue;
                };
                let name = free_name(&index, &parent, &child, self.settings.max_restore_attempts)?;
                let revived = self.revive(tx, &child, &parent, &name, now)?;
                restored += 1;
                let child_path = revived.path();
                pending.extend(child.children.iter().map(|c| (*c, child_path.clone())));
            }

            Ok(RestoreOutcome {
                trash_id: id,
                node_id: node.id,
                original_name: entry.name.clone(),
                renamed: final_name != entry.name,
                final_path: node.path(),
                final_name,
                relocated,
                restored_entries: restored,
            })
        })?;

        info!(
            trash_id = %id,
            node_id = %outcome.node_id,
            user = %user,
            path = %outcome.final_path,
            renamed = outcome.renamed,
            relocated = outcome.relocated,
            entries = outcome.restored_entries,
            "Restored from trash"
        );
        Ok(outcome)
    }

    /// Original parent if still a directory, else the user's home, else the root
    fn target_dir(
        &self,
        index: &PathIndex<'_, TxView<'_>>,
        entry: &TrashEntry,
    ) -> TxResult<(String, bool)> {
        if index.is_dir(&entry.original_parent_path)? {
            return Ok((entry.original_parent_path.clone(), false));
        }
        let home = path::join(&self.settings.home_root, &entry.user);
        if index.is_dir(&home)? {
            return Ok((home, true));
        }
        Ok((ROOT.to_string(), true))
    }

    /// Insert the entry as a live node and drop the entry
    fn revive(
        &self,
        tx: &TxView<'_>,
        entry: &TrashEntry,
        parent: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> TxResult<Node> {
        let id = if self.settings.preserve_identity && tx.node(entry.original_node_id)?.is_none() {
            Some(entry.original_node_id)
        } else {
            None
        };
        let draft = NodeDraft {
            id,
            kind: entry.kind.clone(),
            permissions: entry.permissions.clone(),
            owner: entry.owner.clone(),
            created_at: entry.created_at,
            modified_at: now,
        };
        let node = insert_node(tx, parent, name, &draft)?;
        tx.remove_trash(entry)?;
        Ok(node)
    }
}

/// First free name among `name`, `name (1)`, `name (2)`, ...
///
/// The original name counts as the first attempt, so at most `max_attempts`
/// names are checked and the last candidate is `name (max_attempts - 1)`.
fn free_name<R: FsRead>(
    index: &PathIndex<'_, R>,
    parent: &str,
    entry: &TrashEntry,
    max_attempts: u32,
) -> Result<String, R::Error> {
    if !index.exists(parent, &entry.name)? {
        return Ok(entry.name.clone());
    }
    for n in 1..max_attempts {
        let candidate = path::numbered_name(&entry.name, n);
        if !index.exists(parent, &candidate)? {
            return Ok(candidate);
        }
    }
    Err(FsError::RestoreConflict {
        id: entry.id,
        name: entry.name.clone(),
        parent: parent.to_string(),
    }
    .into())
}
