//! Sled-backed persistence for nodes, the path index and trash
//!
//! Four trees make up the store:
//! - `nodes`: NodeId -> Node
//! - `dirs`: directory path -> ChildMap (the path index)
//! - `trash`: TrashEntryId -> TrashEntry
//! - `trash_by_user`: user 0x00 expires_at trash_id -> () (secondary index)
//!
//! All mutations go through [`SledFsStore::transaction`], which spans every tree.

use super::{ChildMap, FsRead, Node, TrashEntry};
use crate::error::{FsError, StorageError};
use crate::path::ROOT;
use crate::types::{NodeId, TrashEntryId, Username};
use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, TransactionalTree};
use sled::Transactional;
use std::path::Path;

const NODES_TREE: &str = "nodes";
const DIRS_TREE: &str = "dirs";
const TRASH_TREE: &str = "trash";
const TRASH_INDEX_TREE: &str = "trash_by_user";

/// Result type inside a transaction closure
pub type TxResult<T> = Result<T, ConflictableTransactionError<FsError>>;

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, FsError> {
    Ok(bincode::serialize(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, FsError> {
    Ok(bincode::deserialize(bytes)?)
}

/// Key in the `trash_by_user` index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashIndexKey {
    pub user: Username,
    pub expires_at: DateTime<Utc>,
    pub id: TrashEntryId,
}

impl TrashIndexKey {
    pub fn new(user: &str, expires_at: DateTime<Utc>, id: TrashEntryId) -> Self {
        Self {
            user: user.to_string(),
            expires_at,
            id,
        }
    }

    fn user_prefix(user: &str) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(user.len() + 1);
        prefix.extend_from_slice(user.as_bytes());
        prefix.push(0);
        prefix
    }

    /// Flip the sign bit so negative timestamps sort before positive ones
    fn encode_millis(ms: i64) -> [u8; 8] {
        ((ms as u64) ^ (1 << 63)).to_be_bytes()
    }

    fn decode_millis(bytes: [u8; 8]) -> i64 {
        (u64::from_be_bytes(bytes) ^ (1 << 63)) as i64
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut key = Self::user_prefix(&self.user);
        key.extend_from_slice(&Self::encode_millis(self.expires_at.timestamp_millis()));
        key.extend_from_slice(&self.id.to_key());
        key
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let corrupt = || StorageError::Corrupt(format!("bad trash index key ({} bytes)", bytes.len()));
        // Fixed-width suffix: 0x00, expiry millis, id.
        let sep = bytes.len().checked_sub(17).ok_or_else(corrupt)?;
        if bytes[sep] != 0 {
            return Err(corrupt());
        }
        let rest = &bytes[sep + 1..];
        let user = String::from_utf8(bytes[..sep].to_vec()).map_err(|_| corrupt())?;
        let mut millis = [0u8; 8];
        millis.copy_from_slice(&rest[..8]);
        let expires_at = Utc
            .timestamp_millis_opt(Self::decode_millis(millis))
            .single()
            .ok_or_else(corrupt)?;
        let id = TrashEntryId::from_key(&rest[8..]).ok_or_else(corrupt)?;
        Ok(Self {
            user,
            expires_at,
            id,
        })
    }
}

/// Relational store over sled trees
pub struct SledFsStore {
    db: sled::Db,
    nodes: sled::Tree,
    dirs: sled::Tree,
    trash: sled::Tree,
    trash_by_user: sled::Tree,
}

impl SledFsStore {
    /// Open (or create) the store at `path`
    pub fn new(path: &Path) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// In-memory store that disappears on drop
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    pub fn from_db(db: sled::Db) -> Result<Self, StorageError> {
        let nodes = db.open_tree(NODES_TREE)?;
        let dirs = db.open_tree(DIRS_TREE)?;
        let trash = db.open_tree(TRASH_TREE)?;
        let trash_by_user = db.open_tree(TRASH_INDEX_TREE)?;

        if dirs.get(ROOT)?.is_none() {
            let empty = bincode::serialize(&ChildMap::new())?;
            // Another opener may have raced us; either way the root exists afterwards.
            let _ = dirs.compare_and_swap(ROOT, None as Option<&[u8]>, Some(empty))?;
        }

        Ok(Self {
            db,
            nodes,
            dirs,
            trash,
            trash_by_user,
        })
    }

    /// Run `f` atomically across all trees
    ///
    /// `f` may be re-run on conflict, so it must not have side effects outside the view.
    pub fn transaction<T, F>(&self, f: F) -> Result<T, FsError>
    where
        F: Fn(&TxView<'_>) -> TxResult<T>,
    {
        (&self.nodes, &self.dirs, &self.trash, &self.trash_by_user)
            .transaction(|(nodes, dirs, trash, trash_by_user)| {
                let view = TxView {
                    nodes,
                    dirs,
                    trash,
                    trash_by_user,
                };
                f(&view)
            })
            .map_err(FsError::from)
    }

    /// Index keys for one user's trash, in expiry order
    pub fn trash_index_for_user(&self, user: &str) -> Result<Vec<TrashIndexKey>, FsError> {
        let prefix = TrashIndexKey::user_prefix(user);
        let mut keys = Vec::new();
        for item in self.trash_by_user.scan_prefix(prefix) {
            let (key, _) = item?;
            let key = TrashIndexKey::from_bytes(&key)?;
            // The prefix also matches longer names that embed the separator.
            if key.user == user {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    /// Index keys for every user's trash, grouped by user then expiry
    pub fn trash_index_all(&self) -> Result<Vec<TrashIndexKey>, FsError> {
        let mut keys = Vec::new();
        for item in self.trash_by_user.iter() {
            let (key, _) = item?;
            keys.push(TrashIndexKey::from_bytes(&key)?);
        }
        Ok(keys)
    }

    pub fn all_nodes(&self) -> Result<Vec<Node>, FsError> {
        let mut out = Vec::new();
        for item in self.nodes.iter() {
            let (_, value) = item?;
            out.push(decode(&value)?);
        }
        Ok(out)
    }

    pub fn all_dirs(&self) -> Result<Vec<(String, ChildMap)>, FsError> {
        let mut out = Vec::new();
        for item in self.dirs.iter() {
            let (key, value) = item?;
            let path = String::from_utf8(key.to_vec())
                .map_err(|e| StorageError::Corrupt(format!("directory key: {}", e)))?;
            out.push((path, decode(&value)?));
        }
        Ok(out)
    }

    pub fn all_trash(&self) -> Result<Vec<TrashEntry>, FsError> {
        let mut out = Vec::new();
        for item in self.trash.iter() {
            let (_, value) = item?;
            out.push(decode(&value)?);
        }
        Ok(out)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn trash_count(&self) -> usize {
        self.trash.len()
    }

    pub fn flush(&self) -> Result<(), FsError> {
        self.db.flush()?;
        Ok(())
    }
}

impl FsRead for SledFsStore {
    type Error = FsError;

    fn node(&self, id: NodeId) -> Result<Option<Node>, FsError> {
        self.nodes
            .get(id.to_key())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    fn children(&self, dir: &str) -> Result<Option<ChildMap>, FsError> {
        self.dirs
            .get(dir.as_bytes())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    fn trash_entry(&self, id: TrashEntryId) -> Result<Option<TrashEntry>, FsError> {
        self.trash
            .get(id.to_key())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }
}

/// View of every tree inside one transaction
pub struct TxView<'a> {
    nodes: &'a TransactionalTree,
    dirs: &'a TransactionalTree,
    trash: &'a TransactionalTree,
    trash_by_user: &'a TransactionalTree,
}

impl TxView<'_> {
    /// Mint a fresh surrogate id; ids are monotonic and never reused
    pub fn generate_id(&self) -> TxResult<u64> {
        self.nodes
            .generate_id()
            .map_err(ConflictableTransactionError::Storage)
    }

    pub fn put_node(&self, node: &Node) -> TxResult<()> {
        self.nodes.insert(node.id.to_key().to_vec(), encode(node)?)?;
        Ok(())
    }

    pub fn remove_node(&self, id: NodeId) -> TxResult<()> {
        self.nodes.remove(id.to_key().to_vec())?;
        Ok(())
    }

    pub fn put_children(&self, dir: &str, children: &ChildMap) -> TxResult<()> {
        self.dirs.insert(dir.as_bytes(), encode(children)?)?;
        Ok(())
    }

    pub fn remove_dir(&self, dir: &str) -> TxResult<()> {
        self.dirs.remove(dir.as_bytes())?;
        Ok(())
    }

    /// Insert a trash entry together with its index row
    pub fn put_trash(&self, entry: &TrashEntry) -> TxResult<()> {
        self.trash.insert(entry.id.to_key().to_vec(), encode(entry)?)?;
        let key = TrashIndexKey::new(&entry.user, entry.expires_at, entry.id);
        self.trash_by_user.insert(key.to_bytes(), &[] as &[u8])?;
        Ok(())
    }

    /// Remove a trash entry together with its index row
    pub fn remove_trash(&self, entry: &TrashEntry) -> TxResult<()> {
        self.trash.remove(entry.id.to_key().to_vec())?;
        let key = TrashIndexKey::new(&entry.user, entry.expires_at, entry.id);
        self.trash_by_user.remove(key.to_bytes())?;
        Ok(())
    }
}

impl FsRead for TxView<'_> {
    type Error = ConflictableTransactionError<FsError>;

    fn node(&self, id: NodeId) -> TxResult<Option<Node>> {
        match self.nodes.get(id.to_key())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn children(&self, dir: &str) -> TxResult<Option<ChildMap>> {
        match self.dirs.get(dir.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn trash_entry(&self, id: TrashEntryId) -> TxResult<Option<TrashEntry>> {
        match self.trash.get(id.to_key())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }
}
