//! StorageConfig and store path resolution.

use crate::config::xdg;
use crate::error::FsError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory of the sled database; unset means `$XDG_DATA_HOME/deskfs/store`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the store directory; an explicit override (e.g. `--data-dir`) wins
    pub fn resolve_path(&self, override_dir: Option<PathBuf>) -> Result<PathBuf, FsError> {
        if let Some(dir) = override_dir {
            return Ok(dir);
        }
        match &self.path {
            Some(path) if !path.as_os_str().is_empty() => Ok(path.clone()),
            _ => Ok(xdg::data_dir()?.join("store")),
        }
    }
}
