//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::DeskfsConfig;
use crate::error::FsError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the global file, an optional explicit file and environment.
    pub fn load(explicit: Option<&Path>) -> Result<DeskfsConfig, FsError> {
        MergeService::load(explicit)
    }

    /// Load configuration from a specific file only.
    pub fn load_from_file(path: &Path) -> Result<DeskfsConfig, FsError> {
        MergeService::load_from_file(path)
    }

    /// Create default configuration.
    pub fn default() -> DeskfsConfig {
        DeskfsConfig::default()
    }
}
