//! Deskfs: Virtual Desktop Filesystem
//!
//! A per-user virtual file layer for a desktop environment. Live files and
//! directories are addressed by path, deletions go to a per-user trash with a
//! retention window, and trash entries can be restored to their original
//! location, renamed or relocated when that location is taken.

pub mod api;
pub mod bootstrap;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod index;
pub mod integrity;
pub mod logging;
pub mod nodes;
pub mod path;
pub mod store;
pub mod tooling;
pub mod trash;
pub mod types;

pub use api::FileSystemApi;
pub use config::DeskfsConfig;
pub use error::{FsError, StorageError};
pub use store::{DirEntry, Node, NodeKind, NodeType, TrashEntry};
pub use trash::{RestoreOutcome, SweepReport, TrashSettings, TrashStore};
pub use types::{NodeId, TrashEntryId, Username};
