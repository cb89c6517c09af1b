//! XDG Base Directory locations for deskfs data and configuration.

use crate::error::FsError;
use std::path::PathBuf;

const APP_DIR: &str = "deskfs";

/// Get XDG data home directory
///
/// Returns `$XDG_DATA_HOME` if set, otherwise `$HOME/.local/share`
pub fn data_home() -> Option<PathBuf> {
    if let Ok(xdg_data_home) = std::env::var("XDG_DATA_HOME") {
        if !xdg_data_home.is_empty() {
            return Some(PathBuf::from(xdg_data_home));
        }
    }

    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".local").join("share"))
}

/// Get XDG config home directory
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise `$HOME/.config`
pub fn config_home() -> Option<PathBuf> {
    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg_config_home.is_empty() {
            return Some(PathBuf::from(xdg_config_home));
        }
    }

    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config"))
}

/// `$XDG_DATA_HOME/deskfs/`
pub fn data_dir() -> Result<PathBuf, FsError> {
    data_home().map(|home| home.join(APP_DIR)).ok_or_else(|| {
        FsError::ConfigError("Could not determine XDG data home directory (HOME not set)".to_string())
    })
}

/// `$XDG_CONFIG_HOME/deskfs/config.toml`, if a config home can be determined
pub fn global_config_path() -> Option<PathBuf> {
    config_home().map(|home| home.join(APP_DIR).join("config.toml"))
}
