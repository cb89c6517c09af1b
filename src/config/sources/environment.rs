//! Environment variable source: DESKFS__ prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Add environment variable overlay to builder.
/// `DESKFS__TRASH__RETENTION_DAYS=7` sets `trash.retention_days`; the double
/// underscore after the prefix keeps `DESKFS_LOG*` variables out of the config.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let builder = builder.add_source(
        Environment::with_prefix("DESKFS")
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("bootstrap.users")
            .try_parsing(true),
    );
    Ok(builder)
}
