//! Path Index
//!
//! Query surface over the `dirs` tree answering "does (parent, name) exist, and
//! as what". Generic over [`FsRead`] so mutations can run the same checks inside
//! their transaction that readers run outside of one.

use crate::error::{FsError, StorageError};
use crate::path;
use crate::store::{ChildMap, DirEntry, FsRead, Node};
use crate::types::NodeId;

pub struct PathIndex<'a, R: FsRead> {
    reader: &'a R,
}

impl<'a, R: FsRead> PathIndex<'a, R> {
    pub fn new(reader: &'a R) -> Self {
        Self { reader }
    }

    /// True when `path` names a live directory (the root always does)
    pub fn is_dir(&self, path: &str) -> Result<bool, R::Error> {
        Ok(self.reader.children(path)?.is_some())
    }

    pub fn exists(&self, parent: &str, name: &str) -> Result<bool, R::Error> {
        Ok(self.lookup(parent, name)?.is_some())
    }

    pub fn lookup(&self, parent: &str, name: &str) -> Result<Option<NodeId>, R::Error> {
        Ok(self
            .reader
            .children(parent)?
            .and_then(|children| children.get(name).copied()))
    }

    pub fn resolve(&self, parent: &str, name: &str) -> Result<NodeId, R::Error> {
        self.lookup(parent, name)?
            .ok_or_else(|| FsError::NotFound(path::join(parent, name)).into())
    }

    /// Resolve a normalized absolute path to a node. The root is not a node.
    pub fn resolve_path(&self, path: &str) -> Result<NodeId, R::Error> {
        let (parent, name) = path::split(path)
            .ok_or_else(|| FsError::InvalidPath("the root directory is not a node".to_string()))?;
        self.resolve(&parent, &name)
    }

    /// Children of a live directory, `InvalidParent` otherwise
    pub fn children_of(&self, dir: &str) -> Result<ChildMap, R::Error> {
        self.reader
            .children(dir)?
            .ok_or_else(|| FsError::InvalidParent(dir.to_string()).into())
    }

    /// Directories first, then by name
    pub fn list_children(&self, parent: &str) -> Result<Vec<DirEntry>, R::Error> {
        let children = self
            .reader
            .children(parent)?
            .ok_or_else(|| FsError::NotFound(parent.to_string()))?;

        let mut entries = Vec::with_capacity(children.len());
        for (name, id) in &children {
            let node = self.live_node(*id, parent, name)?;
            entries.push(DirEntry::from(&node));
        }
        // BTreeMap already yields names in order; a stable sort keeps it within each group.
        entries.sort_by_key(|e| !matches!(e.node_type, crate::store::NodeType::Directory));
        Ok(entries)
    }

    /// Pre-order walk of `root` and every descendant (directory before its children)
    pub fn collect_subtree(&self, root: Node) -> Result<Vec<Node>, R::Error> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node.is_dir() {
                let dir_path = node.path();
                let children = self.children_of(&dir_path)?;
                // Reverse so the stack pops children in name order.
                for (name, id) in children.iter().rev() {
                    stack.push(self.live_node(*id, &dir_path, name)?);
                }
            }
            out.push(node);
        }
        Ok(out)
    }

    fn live_node(&self, id: NodeId, parent: &str, name: &str) -> Result<Node, R::Error> {
        self.reader.node(id)?.ok_or_else(|| {
            FsError::StorageUnavailable(StorageError::Corrupt(format!(
                "index entry {} points at missing node {}",
                path::join(parent, name),
                id
            )))
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::persistence::SledFsStore;
    use crate::store::{NodeKind, NodeType};
    use crate::types::NodeId;
    use chrono::Utc;

    fn insert(store: &SledFsStore, id: u64, parent: &str, name: &str, kind: NodeKind) {
        let now = Utc::now();
        let node = Node {
            id: NodeId(id),
            name: name.to_string(),
            parent_path: parent.to_string(),
            kind,
            permissions: "rw-r--r--".to_string(),
            owner: "admin".to_string(),
            created_at: now,
            modified_at: now,
        };
        store
            .transaction(|tx| {
                tx.put_node(&node)?;
                let mut children = tx.children(parent)?.unwrap_or_default();
                children.insert(node.name.clone(), node.id);
                tx.put_children(parent, &children)?;
                if node.is_dir() {
                    tx.put_children(&node.path(), &ChildMap::new())?;
                }
                Ok(())
            })
            .unwrap();
    }

    fn sample_store() -> SledFsStore {
        let store = SledFsStore::temporary().unwrap();
        insert(&store, 1, "/", "home", NodeKind::Directory);
        insert(&store, 2, "/home", "zeta.txt", NodeKind::file("z"));
        insert(&store, 3, "/home", "alpha", NodeKind::Directory);
        insert(&store, 4, "/home", "beta.txt", NodeKind::file("bb"));
        insert(&store, 5, "/home/alpha", "inner.txt", NodeKind::file("i"));
        store
    }

    #[test]
    fn test_exists_and_resolve() {
        let store = sample_store();
        let index = PathIndex::new(&store);
        assert!(index.exists("/home", "beta.txt").unwrap());
        assert!(!index.exists("/home", "gamma.txt").unwrap());
        assert!(!index.exists("/missing", "beta.txt").unwrap());
        assert_eq!(index.resolve("/home", "alpha").unwrap(), NodeId(3));
        assert!(matches!(index.resolve("/home", "nope"), Err(FsError::NotFound(_))));
        assert_eq!(index.resolve_path("/home/alpha/inner.txt").unwrap(), NodeId(5));
        assert!(matches!(index.resolve_path("/"), Err(FsError::InvalidPath(_))));
    }

    #[test]
    fn test_list_children_directories_first() {
        let store = sample_store();
        let index = PathIndex::new(&store);
        let names: Vec<_> = index
            .list_children("/home")
            .unwrap()
            .into_iter()
            .map(|e| (e.name, e.node_type))
            .collect();
        assert_eq!(
            names,
            vec![
                ("alpha".to_string(), NodeType::Directory),
                ("beta.txt".to_string(), NodeType::File),
                ("zeta.txt".to_string(), NodeType::File),
            ]
        );
        assert!(index.list_children("/home/alpha/inner.txt").is_err());
        assert!(matches!(index.list_children("/nowhere"), Err(FsError::NotFound(_))));
    }

    #[test]
    fn test_empty_directory_lists_empty() {
        let store = sample_store();
        insert(&store, 6, "/home", "empty", NodeKind::Directory);
        let index = PathIndex::new(&store);
        assert!(index.list_children("/home/empty").unwrap().is_empty());
    }

    #[test]
    fn test_collect_subtree_is_pre_order() {
        let store = sample_store();
        let index = PathIndex::new(&store);
        let home = store.node(NodeId(1)).unwrap().unwrap();
        let paths: Vec<_> = index
            .collect_subtree(home)
            .unwrap()
            .iter()
            .map(|n| n.path())
            .collect();
        assert_eq!(
            paths,
            vec![
                "/home",
                "/home/alpha",
                "/home/alpha/inner.txt",
                "/home/beta.txt",
                "/home/zeta.txt",
            ]
        );
    }
}
