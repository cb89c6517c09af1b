//! Node and Trash records
//!
//! Strongly-typed rows of the two logical tables: live nodes and trash entries.
//! The `FsRead` trait is the read seam shared by the plain store and by the
//! transactional view, so index lookups run identically inside and outside a
//! transaction.

pub mod persistence;

use crate::error::FsError;
use crate::path;
use crate::types::{NodeId, TrashEntryId, Username};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_FILE_PERMISSIONS: &str = "rw-r--r--";
pub const DEFAULT_DIR_PERMISSIONS: &str = "rwxr-xr-x";

/// Live children of one directory: name -> node
pub type ChildMap = BTreeMap<String, NodeId>;

/// Node payload: a file carries content, a directory carries nothing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    File { content: Vec<u8>, size: u64 },
    Directory,
}

impl NodeKind {
    pub fn file(content: impl Into<Vec<u8>>) -> Self {
        let content = content.into();
        let size = content.len() as u64;
        NodeKind::File { content, size }
    }

    pub fn size(&self) -> u64 {
        match self {
            NodeKind::File { size, .. } => *size,
            NodeKind::Directory => 0,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::File { .. } => NodeType::File,
            NodeKind::Directory => NodeType::Directory,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, NodeKind::Directory)
    }
}

/// Discriminant of `NodeKind`, used for listings and create requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    File,
    Directory,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::File => "file",
            NodeType::Directory => "directory",
        }
    }
}

/// Live file or directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub parent_path: String,
    pub kind: NodeKind,
    pub permissions: String,
    pub owner: Username,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Node {
    pub fn path(&self) -> String {
        path::join(&self.parent_path, &self.name)
    }

    pub fn size(&self) -> u64 {
        self.kind.size()
    }

    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// One row of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub node_id: NodeId,
    pub node_type: NodeType,
    pub size: u64,
    pub modified_at: DateTime<Utc>,
    pub owner: Username,
    pub permissions: String,
}

impl From<&Node> for DirEntry {
    fn from(node: &Node) -> Self {
        Self {
            name: node.name.clone(),
            node_id: node.id,
            node_type: node.kind.node_type(),
            size: node.size(),
            modified_at: node.modified_at,
            owner: node.owner.clone(),
            permissions: node.permissions.clone(),
        }
    }
}

/// Immutable snapshot of a soft-deleted node
///
/// `batch_id` names the root entry of the deletion that produced this entry;
/// `children` lists the direct child entries of a directory in that same batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrashEntry {
    pub id: TrashEntryId,
    pub original_node_id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub original_parent_path: String,
    pub permissions: String,
    pub owner: Username,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub user: Username,
    pub deleted_by: Username,
    pub deleted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub batch_id: TrashEntryId,
    pub parent_entry: Option<TrashEntryId>,
    #[serde(default)]
    pub children: Vec<TrashEntryId>,
}

impl TrashEntry {
    pub fn size(&self) -> u64 {
        self.kind.size()
    }

    pub fn original_path(&self) -> String {
        path::join(&self.original_parent_path, &self.name)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Read access shared by the store and the transactional view
pub trait FsRead {
    type Error: From<FsError>;

    fn node(&self, id: NodeId) -> Result<Option<Node>, Self::Error>;

    /// Children of `dir`, or `None` when `dir` is not a live directory
    fn children(&self, dir: &str) -> Result<Option<ChildMap>, Self::Error>;

    fn trash_entry(&self, id: TrashEntryId) -> Result<Option<TrashEntry>, Self::Error>;
}

/// Check a fixed-width advisory permission string such as `rw-r--r--`
pub fn validate_permissions(perms: &str) -> Result<(), FsError> {
    let valid = perms.len() == 9
        && perms.chars().enumerate().all(|(i, c)| {
            c == '-'
                || match i % 3 {
                    0 => c == 'r',
                    1 => c == 'w',
                    _ => c == 'x',
                }
        });
    if valid {
        Ok(())
    } else {
        Err(FsError::InvalidPath(format!(
            "invalid permission string '{}'",
            perms
        )))
    }
}
