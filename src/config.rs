//! Configuration
//!
//! Layered `DeskfsConfig`: built-in defaults, then the global config file, then an
//! explicit `--config` file, then `DESKFS__SECTION__KEY` environment variables.

pub mod facade;
pub mod storage_paths;

pub mod merge {
    pub mod policy;
    pub mod service;
}

pub mod paths {
    pub mod xdg_root;
}

pub mod sources {
    pub mod environment;
    pub mod global_file;
}

pub use facade::ConfigLoader;
pub use paths::xdg_root as xdg;
pub use storage_paths::StorageConfig;

use crate::bootstrap::DEFAULT_USERS;
use crate::error::FsError;
use crate::logging::LoggingConfig;
use crate::trash::{
    TrashSettings, DEFAULT_HOME_ROOT, DEFAULT_MAX_RESTORE_ATTEMPTS, DEFAULT_RETENTION_DAYS,
    MAX_RETENTION_DAYS,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Trash lifecycle configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrashConfig {
    /// Days an entry stays restorable before the sweeper purges it
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Names tried when restoring into an occupied slot, the original name included
    #[serde(default = "default_max_restore_attempts")]
    pub max_restore_attempts: u32,

    /// Parent of per-user home directories
    #[serde(default = "default_home_root")]
    pub home_root: String,

    /// Give a restored node back its original id
    #[serde(default)]
    pub preserve_identity: bool,
}

fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

fn default_max_restore_attempts() -> u32 {
    DEFAULT_MAX_RESTORE_ATTEMPTS
}

fn default_home_root() -> String {
    DEFAULT_HOME_ROOT.to_string()
}

impl Default for TrashConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            max_restore_attempts: default_max_restore_attempts(),
            home_root: default_home_root(),
            preserve_identity: false,
        }
    }
}

impl TrashConfig {
    pub fn settings(&self) -> TrashSettings {
        TrashSettings {
            retention: chrono::Duration::days(self.retention_days as i64),
            max_restore_attempts: self.max_restore_attempts,
            home_root: self.home_root.clone(),
            preserve_identity: self.preserve_identity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweeperConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Sweep once immediately when the sweeper starts
    #[serde(default = "default_true")]
    pub run_on_start: bool,
}

fn default_interval_secs() -> u64 {
    24 * 60 * 60
}

fn default_true() -> bool {
    true
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            run_on_start: true,
        }
    }
}

impl SweeperConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Users that get a home directory with the standard folders
    #[serde(default = "default_users")]
    pub users: Vec<String>,
}

fn default_users() -> Vec<String> {
    DEFAULT_USERS.iter().map(|u| u.to_string()).collect()
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            users: default_users(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeskfsConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub trash: TrashConfig,

    #[serde(default)]
    pub sweeper: SweeperConfig,

    #[serde(default)]
    pub bootstrap: BootstrapConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DeskfsConfig {
    pub fn validate(&self) -> Result<(), FsError> {
        let mut errors = Vec::new();

        if self.trash.retention_days == 0 {
            errors.push("trash.retention_days must be at least 1".to_string());
        }
        if self.trash.retention_days > MAX_RETENTION_DAYS {
            errors.push(format!(
                "trash.retention_days must be at most {}, got {}",
                MAX_RETENTION_DAYS, self.trash.retention_days
            ));
        }
        if self.trash.max_restore_attempts == 0 {
            errors.push("trash.max_restore_attempts must be at least 1".to_string());
        }
        if !self.trash.home_root.starts_with('/') || self.trash.home_root == "/" {
            errors.push(format!(
                "trash.home_root must be an absolute path below /, got '{}'",
                self.trash.home_root
            ));
        }
        if self.sweeper.interval_secs == 0 {
            errors.push("sweeper.interval_secs must be at least 1".to_string());
        }
        for user in &self.bootstrap.users {
            if let Err(e) = crate::path::validate_user(user) {
                errors.push(format!("bootstrap.users: {}", e));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(FsError::ConfigError(errors.join("; ")))
        }
    }
}
