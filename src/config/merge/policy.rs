//! Built-in defaults, the lowest-precedence layer.

use crate::config::DeskfsConfig;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError};

/// Start a builder seeded with the defaults; enum-valued keys fall back to serde defaults.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let defaults = DeskfsConfig::default();
    config::Config::builder()
        .set_default("trash.retention_days", defaults.trash.retention_days as i64)?
        .set_default(
            "trash.max_restore_attempts",
            defaults.trash.max_restore_attempts as i64,
        )?
        .set_default("trash.home_root", defaults.trash.home_root)?
        .set_default("trash.preserve_identity", defaults.trash.preserve_identity)?
        .set_default("sweeper.interval_secs", defaults.sweeper.interval_secs as i64)?
        .set_default("sweeper.run_on_start", defaults.sweeper.run_on_start)?
        .set_default("bootstrap.users", defaults.bootstrap.users)?
        .set_default("logging.enabled", defaults.logging.enabled)?
        .set_default("logging.level", defaults.logging.level)?
        .set_default("logging.color", defaults.logging.color)
}
