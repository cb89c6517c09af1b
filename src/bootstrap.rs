//! Default namespace content
//!
//! Seeds `/home/<user>` with the standard desktop folders for every configured
//! user, plus a welcome note for `admin`. Safe to run on every start.

use crate::error::FsError;
use crate::index::PathIndex;
use crate::nodes::NodeStore;
use crate::path;
use crate::store::persistence::SledFsStore;
use crate::store::NodeType;
use serde::Serialize;
use tracing::{debug, info};

pub const DEFAULT_USERS: [&str; 3] = ["admin", "user", "guest"];
pub const HOME_FOLDERS: [&str; 3] = ["Desktop", "Documents", "Downloads"];
pub const WELCOME_FILE: &str = "welcome.txt";
const WELCOME_USER: &str = "admin";

const WELCOME_TEXT: &str = "Welcome to your desktop!

Files you delete are kept in the trash for 30 days.
Open the trash to restore them or to empty it for good.
";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    pub created: Vec<String>,
    pub existing: usize,
}

/// Create whatever is missing of the default layout; existing nodes are left alone
pub fn bootstrap(
    store: &SledFsStore,
    nodes: &NodeStore,
    home_root: &str,
    users: &[String],
) -> Result<BootstrapReport, FsError> {
    let home_root = path::normalize(home_root)?;
    let mut report = BootstrapReport::default();

    if home_root == path::ROOT {
        return Err(FsError::InvalidPath("home root cannot be /".to_string()));
    }
    let mut parent = path::ROOT.to_string();
    for component in home_root.split(path::SEPARATOR).filter(|c| !c.is_empty()) {
        ensure_dir(store, nodes, &parent, component, WELCOME_USER, &mut report)?;
        parent = path::join(&parent, component);
    }

    for user in users {
        let user = path::validate_user(user)?;
        ensure_dir(store, nodes, &home_root, &user, &user, &mut report)?;
        let home = path::join(&home_root, &user);
        for folder in HOME_FOLDERS {
            ensure_dir(store, nodes, &home, folder, &user, &mut report)?;
        }
        if user == WELCOME_USER {
            if PathIndex::new(store).exists(&home, WELCOME_FILE)? {
                report.existing += 1;
            } else {
                nodes.create(
                    &home,
                    WELCOME_FILE,
                    NodeType::File,
                    Some(WELCOME_TEXT.as_bytes().to_vec()),
                    &user,
                )?;
                report.created.push(path::join(&home, WELCOME_FILE));
            }
        }
    }

    if report.created.is_empty() {
        debug!(existing = report.existing, "Default layout already present");
    } else {
        info!(created = report.created.len(), "Bootstrapped default layout");
    }
    Ok(report)
}

fn ensure_dir(
    store: &SledFsStore,
    nodes: &NodeStore,
    parent: &str,
    name: &str,
    owner: &str,
    report: &mut BootstrapReport,
) -> Result<(), FsError> {
    let full = path::join(parent, name);
    let index = PathIndex::new(store);
    if index.is_dir(&full)? {
        report.existing += 1;
        return Ok(());
    }
    if index.exists(parent, name)? {
        return Err(FsError::InvalidParent(full));
    }
    match nodes.create(parent, name, NodeType::Directory, None, owner) {
        Ok(_) => {
            report.created.push(full);
            Ok(())
        }
        // Lost a race with another bootstrap; the directory is there either way.
        Err(FsError::AlreadyExists(_)) => {
            report.existing += 1;
            Ok(())
        }
        Err(e) => Err(e),
    }
}
