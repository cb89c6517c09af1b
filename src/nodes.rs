//! Node Store
//!
//! CRUD on live nodes. Every call is one transaction: the path index is checked
//! and updated in the same unit as the node rows, so a failed call leaves no trace.

use crate::error::FsError;
use crate::index::PathIndex;
use crate::path;
use crate::store::persistence::{SledFsStore, TxResult, TxView};
use crate::store::{
    validate_permissions, ChildMap, FsRead, Node, NodeKind, NodeType, TrashEntry,
    DEFAULT_DIR_PERMISSIONS, DEFAULT_FILE_PERMISSIONS,
};
use crate::trash::TrashStore;
use crate::types::NodeId;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// Everything needed to insert a node except its location
#[derive(Debug, Clone)]
pub(crate) struct NodeDraft {
    /// Reuse this id instead of minting one
    pub id: Option<NodeId>,
    pub kind: NodeKind,
    pub permissions: String,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl NodeDraft {
    pub fn fresh(kind: NodeKind, owner: &str, now: DateTime<Utc>) -> Self {
        let permissions = if kind.is_dir() {
            DEFAULT_DIR_PERMISSIONS
        } else {
            DEFAULT_FILE_PERMISSIONS
        };
        Self {
            id: None,
            kind,
            permissions: permissions.to_string(),
            owner: owner.to_string(),
            created_at: now,
            modified_at: now,
        }
    }
}

/// Insert a node under `parent` inside a transaction
///
/// Fails with `InvalidParent` if `parent` is not a live directory and with
/// `AlreadyExists` if `(parent, name)` is taken.
pub(crate) fn insert_node(tx: &TxView<'_>, parent: &str, name: &str, draft: &NodeDraft) -> TxResult<Node> {
    let index = PathIndex::new(tx);
    let mut siblings = index.children_of(parent)?;
    if siblings.contains_key(name) {
        return Err(FsError::AlreadyExists(path::join(parent, name)).into());
    }

    let id = match draft.id {
        Some(id) => id,
        None => NodeId(tx.generate_id()?),
    };
    let node = Node {
        id,
        name: name.to_string(),
        parent_path: parent.to_string(),
        kind: draft.kind.clone(),
        permissions: draft.permissions.clone(),
        owner: draft.owner.clone(),
        created_at: draft.created_at,
        modified_at: draft.modified_at,
    };

    tx.put_node(&node)?;
    siblings.insert(node.name.clone(), node.id);
    tx.put_children(parent, &siblings)?;
    if node.is_dir() {
        tx.put_children(&node.path(), &ChildMap::new())?;
    }
    Ok(node)
}

/// Remove `root` and its whole subtree from the live namespace
///
/// Returns the removed nodes in pre-order, as snapshotted inside the transaction.
pub(crate) fn detach_subtree(tx: &TxView<'_>, root: Node) -> TxResult<Vec<Node>> {
    let index = PathIndex::new(tx);
    let mut siblings = index.children_of(&root.parent_path)?;
    siblings.remove(&root.name);
    tx.put_children(&root.parent_path, &siblings)?;

    let subtree = index.collect_subtree(root)?;
    for node in &subtree {
        tx.remove_node(node.id)?;
        if node.is_dir() {
            tx.remove_dir(&node.path())?;
        }
    }
    Ok(subtree)
}

/// Move `node` to `(new_parent, new_name)`, re-keying a directory's subtree
fn relocate(
    tx: &TxView<'_>,
    node: Node,
    new_parent: &str,
    new_name: &str,
    now: DateTime<Utc>,
) -> TxResult<Node> {
    let index = PathIndex::new(tx);
    let old_path = node.path();
    let new_path = path::join(new_parent, new_name);

    if node.parent_path == new_parent {
        let mut siblings = index.children_of(new_parent)?;
        siblings.remove(&node.name);
        siblings.insert(new_name.to_string(), node.id);
        tx.put_children(new_parent, &siblings)?;
    } else {
        let mut old_siblings = index.children_of(&node.parent_path)?;
        old_siblings.remove(&node.name);
        tx.put_children(&node.parent_path, &old_siblings)?;
        let mut new_siblings = index.children_of(new_parent)?;
        new_siblings.insert(new_name.to_string(), node.id);
        tx.put_children(new_parent, &new_siblings)?;
    }

    if node.is_dir() {
        let subtree = index.collect_subtree(node.clone())?;
        for member in &subtree {
            if member.is_dir() {
                let member_path = member.path();
                let children = index.children_of(&member_path)?;
                tx.remove_dir(&member_path)?;
                tx.put_children(&path::rebase(&member_path, &old_path, &new_path), &children)?;
            }
            if member.id != node.id {
                let mut moved = member.clone();
                moved.parent_path = path::rebase(&member.parent_path, &old_path, &new_path);
                tx.put_node(&moved)?;
            }
        }
    }

    let mut updated = node;
    updated.name = new_name.to_string();
    updated.parent_path = new_parent.to_string();
    updated.modified_at = now;
    tx.put_node(&updated)?;
    Ok(updated)
}

/// Live-node operations
#[derive(Clone)]
pub struct NodeStore {
    store: Arc<SledFsStore>,
    trash: TrashStore,
}

impl NodeStore {
    pub fn new(store: Arc<SledFsStore>, trash: TrashStore) -> Self {
        Self { store, trash }
    }

    pub fn get(&self, id: NodeId) -> Result<Node, FsError> {
        self.store
            .node(id)?
            .ok_or_else(|| FsError::NotFound(format!("node {}", id)))
    }

    /// Create a file or directory; a file's size derives from its content
    pub fn create(
        &self,
        parent: &str,
        name: &str,
        node_type: NodeType,
        content: Option<Vec<u8>>,
        owner: &str,
    ) -> Result<NodeId, FsError> {
        let parent = path::normalize(parent)?;
        let name = path::validate_name(name)?;
        let kind = match node_type {
            NodeType::File => NodeKind::file(content.unwrap_or_default()),
            NodeType::Directory => {
                if content.as_ref().is_some_and(|c| !c.is_empty()) {
                    return Err(FsError::NotAFile(path::join(&parent, &name)));
                }
                NodeKind::Directory
            }
        };
        let draft = NodeDraft::fresh(kind, owner, Utc::now());

        let node = self
            .store
            .transaction(|tx| insert_node(tx, &parent, &name, &draft))?;

        info!(
            node_id = %node.id,
            path = %node.path(),
            kind = node_type.as_str(),
            owner = %owner,
            "Created node"
        );
        Ok(node.id)
    }

    /// Rename in place; renaming to the current name is a no-op
    pub fn rename(&self, id: NodeId, new_name: &str) -> Result<(), FsError> {
        let new_name = path::validate_name(new_name)?;
        let now = Utc::now();
        let renamed = self.store.transaction(|tx| {
            let node = tx
                .node(id)?
                .ok_or_else(|| FsError::NotFound(format!("node {}", id)))?;
            if node.name == new_name {
                return Ok(None);
            }
            if PathIndex::new(tx).exists(&node.parent_path, &new_name)? {
                return Err(FsError::AlreadyExists(path::join(&node.parent_path, &new_name)).into());
            }
            let parent = node.parent_path.clone();
            relocate(tx, node, &parent, &new_name, now).map(Some)
        })?;

        match renamed {
            Some(node) => info!(node_id = %id, path = %node.path(), "Renamed node"),
            None => debug!(node_id = %id, "Rename to same name ignored"),
        }
        Ok(())
    }

    /// Move a node (and a directory's subtree) under another directory
    pub fn move_node(&self, id: NodeId, new_parent: &str) -> Result<(), FsError> {
        let new_parent = path::normalize(new_parent)?;
        let now = Utc::now();
        let moved = self.store.transaction(|tx| {
            let node = tx
                .node(id)?
                .ok_or_else(|| FsError::NotFound(format!("node {}", id)))?;
            if node.parent_path == new_parent {
                return Ok(node);
            }
            if node.is_dir() && path::is_within(&new_parent, &node.path()) {
                return Err(FsError::InvalidParent(new_parent.clone()).into());
            }
            let index = PathIndex::new(tx);
            if !index.is_dir(&new_parent)? {
                return Err(FsError::InvalidParent(new_parent.clone()).into());
            }
            if index.exists(&new_parent, &node.name)? {
                return Err(FsError::AlreadyExists(path::join(&new_parent, &node.name)).into());
            }
            let name = node.name.clone();
            relocate(tx, node, &new_parent, &name, now)
        })?;

        info!(node_id = %id, path = %moved.path(), "Moved node");
        Ok(())
    }

    /// Replace a file's content, updating size and modification time
    pub fn write_content(&self, id: NodeId, content: Vec<u8>) -> Result<(), FsError> {
        let now = Utc::now();
        let size = content.len();
        self.store.transaction(|tx| {
            let mut node = tx
                .node(id)?
                .ok_or_else(|| FsError::NotFound(format!("node {}", id)))?;
            if node.is_dir() {
                return Err(FsError::NotAFile(node.path()).into());
            }
            node.kind = NodeKind::file(content.clone());
            node.modified_at = now;
            tx.put_node(&node)
        })?;

        debug!(node_id = %id, size, "Wrote file content");
        Ok(())
    }

    /// Update the advisory permission string
    pub fn set_permissions(&self, id: NodeId, permissions: &str) -> Result<(), FsError> {
        validate_permissions(permissions)?;
        self.store.transaction(|tx| {
            let mut node = tx
                .node(id)?
                .ok_or_else(|| FsError::NotFound(format!("node {}", id)))?;
            node.permissions = permissions.to_string();
            tx.put_node(&node)
        })?;
        debug!(node_id = %id, permissions, "Updated permissions");
        Ok(())
    }

    /// Soft-delete a node and, for a directory, its whole subtree
    ///
    /// Returns the entry for `id` itself; descendants get entries of their own.
    pub fn remove(&self, id: NodeId, deleted_by: &str) -> Result<TrashEntry, FsError> {
        self.trash.move_to_trash(id, deleted_by)
    }
}
