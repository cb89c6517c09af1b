//! Collaborator API
//!
//! The surface consumed by the file browser, the trash bin and the terminal.
//! Every call takes the acting user explicitly; there is no ambient "current user".

use crate::bootstrap::{self, BootstrapReport};
use crate::concurrency::EntryLockManager;
use crate::config::DeskfsConfig;
use crate::error::FsError;
use crate::index::PathIndex;
use crate::integrity::{self, IntegrityReport};
use crate::nodes::NodeStore;
use crate::path;
use crate::store::persistence::SledFsStore;
use crate::store::{DirEntry, FsRead, Node, NodeKind, NodeType, TrashEntry};
use crate::trash::{
    ExpirySweeper, RestoreOutcome, RestoreResolver, SweepReport, TrashSettings, TrashStore,
};
use crate::types::{NodeId, TrashEntryId};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub struct FileSystemApi {
    store: Arc<SledFsStore>,
    nodes: NodeStore,
    trash: TrashStore,
    resolver: RestoreResolver,
    locks: Arc<EntryLockManager>,
    sweeper: Arc<ExpirySweeper>,
}

impl FileSystemApi {
    pub fn new(store: Arc<SledFsStore>, settings: TrashSettings) -> Self {
        let trash = TrashStore::new(Arc::clone(&store), settings.clone());
        let nodes = NodeStore::new(Arc::clone(&store), trash.clone());
        let resolver = RestoreResolver::new(Arc::clone(&store), settings);
        let sweeper = Arc::new(ExpirySweeper::new(Arc::new(trash.clone())));
        Self {
            store,
            nodes,
            trash,
            resolver,
            locks: Arc::new(EntryLockManager::new()),
            sweeper,
        }
    }

    /// Open the store named by `config`, or `data_dir` when given
    pub fn open(config: &DeskfsConfig, data_dir: Option<PathBuf>) -> Result<Self, FsError> {
        let path = config.storage.resolve_path(data_dir)?;
        let store = SledFsStore::new(&path)?;
        info!(path = %path.display(), "Opened filesystem store");
        Ok(Self::new(Arc::new(store), config.trash.settings()))
    }

    /// Throwaway in-memory instance
    pub fn temporary(settings: TrashSettings) -> Result<Self, FsError> {
        Ok(Self::new(Arc::new(SledFsStore::temporary()?), settings))
    }

    pub fn settings(&self) -> &TrashSettings {
        self.trash.settings()
    }

    pub fn sweeper(&self) -> &Arc<ExpirySweeper> {
        &self.sweeper
    }

    fn index(&self) -> PathIndex<'_, SledFsStore> {
        PathIndex::new(self.store.as_ref())
    }

    // Namespace

    /// Children of a directory, directories first then by name
    pub fn list_directory(&self, dir: &str) -> Result<Vec<DirEntry>, FsError> {
        self.index().list_children(&path::normalize(dir)?)
    }

    pub fn exists(&self, parent: &str, name: &str) -> Result<bool, FsError> {
        self.index().exists(&path::normalize(parent)?, name)
    }

    pub fn resolve(&self, parent: &str, name: &str) -> Result<NodeId, FsError> {
        self.index().resolve(&path::normalize(parent)?, name)
    }

    pub fn resolve_path(&self, abs_path: &str) -> Result<NodeId, FsError> {
        self.index().resolve_path(&path::normalize(abs_path)?)
    }

    pub fn stat(&self, abs_path: &str) -> Result<Node, FsError> {
        self.nodes.get(self.resolve_path(abs_path)?)
    }

    pub fn get_node(&self, id: NodeId) -> Result<Node, FsError> {
        self.nodes.get(id)
    }

    pub fn create_node(
        &self,
        parent: &str,
        name: &str,
        node_type: NodeType,
        content: Option<Vec<u8>>,
        owner: &str,
    ) -> Result<NodeId, FsError> {
        let owner = path::validate_user(owner)?;
        self.nodes.create(parent, name, node_type, content, &owner)
    }

    pub fn read_file(&self, abs_path: &str) -> Result<Vec<u8>, FsError> {
        let node = self.stat(abs_path)?;
        let path = node.path();
        match node.kind {
            NodeKind::File { content, .. } => Ok(content),
            NodeKind::Directory => Err(FsError::NotAFile(path)),
        }
    }

    /// Create the file if missing, otherwise replace its content
    pub fn write_file(&self, abs_path: &str, content: Vec<u8>, user: &str) -> Result<NodeId, FsError> {
        let user = path::validate_user(user)?;
        let abs_path = path::normalize(abs_path)?;
        let (parent, name) = path::split(&abs_path)
            .ok_or_else(|| FsError::NotAFile(abs_path.clone()))?;
        match self.index().lookup(&parent, &name)? {
            Some(id) => {
                self.nodes.write_content(id, content)?;
                Ok(id)
            }
            None => self.nodes.create(&parent, &name, NodeType::File, Some(content), &user),
        }
    }

    pub fn rename(&self, id: NodeId, new_name: &str) -> Result<(), FsError> {
        self.nodes.rename(id, new_name)
    }

    pub fn move_node(&self, id: NodeId, new_parent: &str) -> Result<(), FsError> {
        self.nodes.move_node(id, new_parent)
    }

    pub fn write_content(&self, id: NodeId, content: Vec<u8>) -> Result<(), FsError> {
        self.nodes.write_content(id, content)
    }

    pub fn set_permissions(&self, id: NodeId, permissions: &str) -> Result<(), FsError> {
        self.nodes.set_permissions(id, permissions)
    }

    /// Soft-delete a node (recursively for a directory) into `acting_user`'s trash
    pub fn delete_to_trash(&self, id: NodeId, acting_user: &str) -> Result<TrashEntryId, FsError> {
        let acting_user = path::validate_user(acting_user)?;
        Ok(self.nodes.remove(id, &acting_user)?.id)
    }

    // Trash

    pub fn list_trash(&self, user: &str, limit: Option<usize>) -> Result<Vec<TrashEntry>, FsError> {
        self.trash.list_for_user(&path::validate_user(user)?, limit)
    }

    /// One of `user`'s entries; other users' entries are reported as missing
    pub fn trash_entry(&self, id: TrashEntryId, user: &str) -> Result<TrashEntry, FsError> {
        let user = path::validate_user(user)?;
        match self.store.trash_entry(id)? {
            Some(entry) if entry.user == user => Ok(entry),
            _ => Err(FsError::NotFound(format!("trash entry {}", id))),
        }
    }

    /// Restore an entry; racing restores of the same entry see one success and one `NotFound`
    pub fn restore_from_trash(&self, id: TrashEntryId, user: &str) -> Result<RestoreOutcome, FsError> {
        let user = path::validate_user(user)?;
        let lock = self.locks.get_lock(id);
        let result = {
            let _guard = lock.lock();
            self.resolver.restore(id, &user)
        };
        drop(lock);
        self.locks.release_idle();
        result
    }

    /// Permanently delete one of `user`'s entries; `false` when it was already gone
    pub fn purge(&self, id: TrashEntryId, user: &str) -> Result<bool, FsError> {
        let user = path::validate_user(user)?;
        let lock = self.locks.get_lock(id);
        let result = {
            let _guard = lock.lock();
            self.trash.purge_for_user(id, &user)
        };
        drop(lock);
        self.locks.release_idle();
        result
    }

    pub fn empty_trash(&self, user: &str) -> Result<usize, FsError> {
        self.trash.purge_all_for_user(&path::validate_user(user)?)
    }

    pub fn trash_size(&self, user: &str) -> Result<u64, FsError> {
        self.trash.total_size_for_user(&path::validate_user(user)?)
    }

    pub fn trash_count(&self, user: &str) -> Result<usize, FsError> {
        self.trash.count_for_user(&path::validate_user(user)?)
    }

    /// Run one sweep now, on the calling thread
    pub fn sweep_expired(&self) -> SweepReport {
        self.sweeper.sweep()
    }

    // Maintenance

    pub fn bootstrap(&self, users: &[String]) -> Result<BootstrapReport, FsError> {
        bootstrap::bootstrap(&self.store, &self.nodes, &self.trash.settings().home_root, users)
    }

    pub fn validate(&self) -> Result<IntegrityReport, FsError> {
        integrity::check(&self.store)
    }

    pub fn node_count(&self) -> usize {
        self.store.node_count()
    }

    pub fn flush(&self) -> Result<(), FsError> {
        self.store.flush()
    }
}
