//! Store integrity checks
//!
//! Cross-checks the node rows, the path index and the trash tables. A healthy
//! store has every live node indexed exactly once under its own parent, and no
//! node both live and in the trash.

use crate::error::FsError;
use crate::path::{self, ROOT};
use crate::store::persistence::SledFsStore;
use crate::store::{ChildMap, Node};
use crate::types::NodeId;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub nodes: usize,
    pub directories: usize,
    pub trash_entries: usize,
    pub issues: Vec<String>,
}

impl IntegrityReport {
    pub fn is_consistent(&self) -> bool {
        self.issues.is_empty()
    }
}

pub fn check(store: &SledFsStore) -> Result<IntegrityReport, FsError> {
    let nodes: HashMap<NodeId, Node> = store
        .all_nodes()?
        .into_iter()
        .map(|node| (node.id, node))
        .collect();
    let dirs: HashMap<String, ChildMap> = store.all_dirs()?.into_iter().collect();
    let trash = store.all_trash()?;
    let index_keys = store.trash_index_all()?;

    let mut issues = Vec::new();

    if !dirs.contains_key(ROOT) {
        issues.push("root directory entry is missing".to_string());
    }

    let mut indexed: HashSet<NodeId> = HashSet::new();
    for (dir, children) in &dirs {
        if dir != ROOT {
            let is_live_dir = path::split(dir)
                .and_then(|(parent, name)| dirs.get(&parent).and_then(|c| c.get(&name)))
                .and_then(|id| nodes.get(id))
                .is_some_and(Node::is_dir);
            if !is_live_dir {
                issues.push(format!("directory entry {} has no live directory node", dir));
            }
        }
        for (name, id) in children {
            match nodes.get(id) {
                None => issues.push(format!("{} points at missing node {}", path::join(dir, name), id)),
                Some(node) if node.parent_path != *dir || node.name != *name => issues.push(format!(
                    "{} points at node {} which lives at {}",
                    path::join(dir, name),
                    id,
                    node.path()
                )),
                Some(_) => {}
            }
            if !indexed.insert(*id) {
                issues.push(format!("node {} is indexed more than once", id));
            }
        }
    }

    for (id, node) in &nodes {
        if !indexed.contains(id) {
            issues.push(format!("node {} at {} is not indexed", id, node.path()));
        }
        if node.is_dir() && !dirs.contains_key(&node.path()) {
            issues.push(format!("directory {} has no children entry", node.path()));
        }
    }

    let mut trash_ids = HashSet::new();
    for entry in &trash {
        trash_ids.insert(entry.id);
        if let Some(live) = nodes.get(&entry.original_node_id) {
            // A restored entry is removed in the same transaction, so a live twin is a leak.
            issues.push(format!(
                "node {} is live at {} while trash entry {} holds it",
                live.id,
                live.path(),
                entry.id
            ));
        }
        let has_index = index_keys
            .iter()
            .any(|k| k.id == entry.id && k.user == entry.user && k.expires_at == entry.expires_at);
        if !has_index {
            issues.push(format!("trash entry {} is missing from the user index", entry.id));
        }
    }
    for key in &index_keys {
        if !trash_ids.contains(&key.id) {
            issues.push(format!("user index row for {} points at a missing trash entry", key.id));
        }
    }

    Ok(IntegrityReport {
        nodes: nodes.len(),
        directories: dirs.len(),
        trash_entries: trash.len(),
        issues,
    })
}
