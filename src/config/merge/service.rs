//! MergeService: orchestrates sources, applies merge policy, deserializes to DeskfsConfig.

use crate::config::sources::{environment, global_file};
use crate::config::DeskfsConfig;
use crate::error::FsError;
use config::{File, FileFormat};
use std::path::Path;
use tracing::debug;

use super::policy;

/// Merge service for config composition.
pub struct MergeService;

impl MergeService {
    /// Load config from the standard sources plus an optional explicit file.
    /// Precedence: defaults (lowest) -> global file -> explicit file -> environment (highest).
    pub fn load(explicit: Option<&Path>) -> Result<DeskfsConfig, FsError> {
        let builder = policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = match explicit {
            Some(path) => {
                debug!(path = %path.display(), "Loading explicit config file");
                builder.add_source(File::from(path).format(FileFormat::Toml).required(true))
            }
            None => builder,
        };
        let builder = environment::add_to_builder(builder)?;

        let config: DeskfsConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load a single file over the defaults, ignoring the global file and environment.
    pub fn load_from_file(path: &Path) -> Result<DeskfsConfig, FsError> {
        let builder = policy::builder_with_defaults()?
            .add_source(File::from(path).format(FileFormat::Toml).required(true));

        let config: DeskfsConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[trash]\nretention_days = 7\npreserve_identity = true\n\n[sweeper]\ninterval_secs = 60"
        )
        .unwrap();

        let config = MergeService::load_from_file(file.path()).unwrap();
        assert_eq!(config.trash.retention_days, 7);
        assert!(config.trash.preserve_identity);
        assert_eq!(config.trash.max_restore_attempts, 1000);
        assert_eq!(config.sweeper.interval_secs, 60);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[trash]\nmax_restore_attempts = 0").unwrap();
        assert!(matches!(
            MergeService::load_from_file(file.path()),
            Err(FsError::ConfigError(_))
        ));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(MergeService::load(Some(&missing)).is_err());
    }
}
