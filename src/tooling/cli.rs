//! CLI Tooling
//!
//! Terminal collaborator for the virtual filesystem. Every command runs as the
//! `--user` given on the command line and returns its output as a string.

use crate::api::FileSystemApi;
use crate::config::{ConfigLoader, DeskfsConfig};
use crate::error::FsError;
use crate::logging::{LogFormat, LogOutput};
use crate::path;
use crate::store::NodeType;
use crate::tooling::format::{
    format_integrity, format_listing, format_restore, format_size, format_sweep_report,
    format_trash_info, format_trash_list, success, to_json, OutputFormat, TrashSummary,
};
use crate::types::TrashEntryId;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Deskfs CLI - virtual desktop filesystem with a trash bin
#[derive(Parser)]
#[command(name = "deskfs")]
#[command(about = "Virtual desktop filesystem with a recoverable trash bin")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Store directory (overrides storage.path)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Configuration file layered over the global config
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Acting user
    #[arg(long, short, global = true, default_value = "admin")]
    pub user: String,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Load layered config and fold the logging flags into it
    pub fn load_config(&self) -> Result<DeskfsConfig, FsError> {
        let mut config = ConfigLoader::load(self.config.as_deref())?;
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.logging.format = format.parse::<LogFormat>()?;
        }
        if let Some(output) = &self.log_output {
            config.logging.output = output.parse::<LogOutput>()?;
        }
        if let Some(file) = &self.log_file {
            config.logging.file = Some(file.clone());
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the default home directories
    Init,
    /// List a directory
    Ls {
        /// Directory (default: your home)
        path: Option<String>,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Show one node's metadata
    Stat {
        path: String,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Create a directory
    Mkdir { path: String },
    /// Create an empty file
    Touch { path: String },
    /// Create or overwrite a file with the given text
    Write { path: String, content: String },
    /// Print a file
    Cat { path: String },
    /// Rename a node in place
    Rename { path: String, name: String },
    /// Move a node into another directory
    Mv { path: String, dir: String },
    /// Change the advisory permission string
    Chmod { permissions: String, path: String },
    /// Move a node (recursively) to the trash
    Rm { path: String },
    /// Trash bin commands
    Trash {
        #[command(subcommand)]
        command: TrashCommands,
    },
    /// Purge expired trash entries
    Sweep {
        /// Keep running on the configured interval until Ctrl-C
        #[arg(long)]
        daemon: bool,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Check index, node and trash consistency
    Validate {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum TrashCommands {
    /// Item count and total size of your trash
    Info {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// List your trash, most recently deleted first
    List {
        #[arg(long)]
        limit: Option<usize>,
        /// Only entries whose name or original path contains this text
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Restore entries to their original location
    Restore {
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    /// Permanently delete entries
    Purge {
        #[arg(required = true)]
        ids: Vec<u64>,
        /// Skip confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Permanently delete everything in your trash
    Empty {
        /// Skip confirmation
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
}

/// CLI context holding the opened filesystem
pub struct CliContext {
    api: FileSystemApi,
    config: DeskfsConfig,
    user: String,
}

impl CliContext {
    /// Open the store named by the config, or `data_dir` when given
    pub fn new(config: DeskfsConfig, data_dir: Option<PathBuf>, user: &str) -> Result<Self, FsError> {
        let api = FileSystemApi::open(&config, data_dir)?;
        let context = Self::from_parts(api, config, user)?;
        if context.config.sweeper.run_on_start {
            context.api.sweep_expired();
        }
        Ok(context)
    }

    pub fn from_parts(api: FileSystemApi, config: DeskfsConfig, user: &str) -> Result<Self, FsError> {
        let user = path::validate_user(user)?;
        Ok(Self { api, config, user })
    }

    pub fn api(&self) -> &FileSystemApi {
        &self.api
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    fn home(&self) -> String {
        path::join(&self.config.trash.home_root, &self.user)
    }

    /// Absolute paths are taken as is; relative ones are relative to the user's home
    fn resolve_arg(&self, arg: &str) -> Result<String, FsError> {
        if arg.starts_with(path::SEPARATOR) {
            path::normalize(arg)
        } else {
            path::normalize(&format!("{}/{}", self.home(), arg))
        }
    }

    fn split_arg(&self, arg: &str) -> Result<(String, String), FsError> {
        let full = self.resolve_arg(arg)?;
        path::split(&full).ok_or_else(|| FsError::InvalidPath("the root directory is not a node".to_string()))
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<String, FsError> {
        match command {
            Commands::Init => {
                let report = self.api.bootstrap(&self.config.bootstrap.users)?;
                Ok(success(&format!(
                    "Initialized filesystem: {} created, {} already present",
                    report.created.len(),
                    report.existing
                )))
            }
            Commands::Ls { path, format } => {
                let dir = match path {
                    Some(p) => self.resolve_arg(p)?,
                    None => self.home(),
                };
                let entries = self.api.list_directory(&dir)?;
                format_listing(&dir, &entries, *format)
            }
            Commands::Stat { path, format } => {
                let node = self.api.stat(&self.resolve_arg(path)?)?;
                match format {
                    OutputFormat::Json => to_json(&crate::store::DirEntry::from(&node)),
                    OutputFormat::Text => Ok(format!(
                        "{}\n  Type: {}\n  Size: {}\n  Owner: {}\n  Permissions: {}\n  Created: {}\n  Modified: {}",
                        node.path(),
                        node.kind.node_type().as_str(),
                        format_size(node.size()),
                        node.owner,
                        node.permissions,
                        node.created_at.to_rfc3339(),
                        node.modified_at.to_rfc3339()
                    )),
                }
            }
            Commands::Mkdir { path } => {
                let (parent, name) = self.split_arg(path)?;
                self.api.create_node(&parent, &name, NodeType::Directory, None, &self.user)?;
                Ok(success(&format!("Created directory {}", path::join(&parent, &name))))
            }
            Commands::Touch { path } => {
                let (parent, name) = self.split_arg(path)?;
                self.api.create_node(&parent, &name, NodeType::File, None, &self.user)?;
                Ok(success(&format!("Created file {}", path::join(&parent, &name))))
            }
            Commands::Write { path, content } => {
                let full = self.resolve_arg(path)?;
                self.api.write_file(&full, content.as_bytes().to_vec(), &self.user)?;
                Ok(success(&format!("Wrote {} to {}", format_size(content.len() as u64), full)))
            }
            Commands::Cat { path } => {
                let content = self.api.read_file(&self.resolve_arg(path)?)?;
                Ok(String::from_utf8_lossy(&content).into_owned())
            }
            Commands::Rename { path, name } => {
                let id = self.api.resolve_path(&self.resolve_arg(path)?)?;
                self.api.rename(id, name)?;
                Ok(success(&format!("Renamed to {}", self.api.get_node(id)?.path())))
            }
            Commands::Mv { path, dir } => {
                let id = self.api.resolve_path(&self.resolve_arg(path)?)?;
                self.api.move_node(id, &self.resolve_arg(dir)?)?;
                Ok(success(&format!("Moved to {}", self.api.get_node(id)?.path())))
            }
            Commands::Chmod { permissions, path } => {
                let id = self.api.resolve_path(&self.resolve_arg(path)?)?;
                self.api.set_permissions(id, permissions)?;
                Ok(success(&format!("Permissions set to {}", permissions)))
            }
            Commands::Rm { path } => {
                let full = self.resolve_arg(path)?;
                let id = self.api.resolve_path(&full)?;
                let trash_id = self.api.delete_to_trash(id, &self.user)?;
                Ok(success(&format!("Moved {} to trash (entry {})", full, trash_id)))
            }
            Commands::Trash { command } => self.execute_trash(command),
            Commands::Sweep { daemon, format } => {
                if *daemon {
                    self.run_sweeper_daemon()?;
                    return Ok("Sweeper stopped".to_string());
                }
                format_sweep_report(&self.api.sweep_expired(), *format)
            }
            Commands::Validate { format } => format_integrity(&self.api.validate()?, *format),
            Commands::Config { command } => match command {
                ConfigCommands::Show => toml::to_string_pretty(&self.config)
                    .map_err(|e| FsError::ConfigError(format!("cannot render config: {}", e))),
            },
        }
    }

    fn execute_trash(&self, command: &TrashCommands) -> Result<String, FsError> {
        match command {
            TrashCommands::Info { format } => {
                let summary = TrashSummary {
                    user: &self.user,
                    items: self.api.trash_count(&self.user)?,
                    total_size: self.api.trash_size(&self.user)?,
                    retention_days: self.api.settings().retention.num_days(),
                };
                format_trash_info(&summary, *format)
            }
            TrashCommands::List {
                limit,
                search,
                format,
            } => {
                let mut entries = self.api.list_trash(&self.user, None)?;
                if let Some(term) = search {
                    let term = term.to_lowercase();
                    entries.retain(|e| e.original_path().to_lowercase().contains(&term));
                }
                if let Some(limit) = limit {
                    entries.truncate(*limit);
                }
                format_trash_list(&entries, *format)
            }
            TrashCommands::Restore { ids } => {
                let mut outcomes = Vec::with_capacity(ids.len());
                for id in ids {
                    outcomes.push(self.api.restore_from_trash(TrashEntryId(*id), &self.user)?);
                }
                Ok(format_restore(&outcomes))
            }
            TrashCommands::Purge { ids, yes } => {
                if !yes
                    && !confirm(&format!(
                        "Permanently delete {} item(s)? This cannot be undone",
                        ids.len()
                    ))?
                {
                    return Ok("Deletion cancelled".to_string());
                }
                let mut purged = 0;
                for id in ids {
                    if self.api.purge(TrashEntryId(*id), &self.user)? {
                        purged += 1;
                    }
                }
                Ok(success(&format!("Permanently deleted {} item(s).", purged)))
            }
            TrashCommands::Empty { yes } => {
                let count = self.api.trash_count(&self.user)?;
                if count == 0 {
                    return Ok("Trash is already empty.".to_string());
                }
                let size = self.api.trash_size(&self.user)?;
                if !yes
                    && !confirm(&format!(
                        "Permanently delete all {} item(s) ({}) from trash? This cannot be undone",
                        count,
                        format_size(size)
                    ))?
                {
                    return Ok("Empty trash cancelled".to_string());
                }
                let removed = self.api.empty_trash(&self.user)?;
                Ok(success(&format!("Emptied {} item(s) from trash.", removed)))
            }
        }
    }

    /// Run the sweeper on its interval until Ctrl-C
    fn run_sweeper_daemon(&self) -> Result<(), FsError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| FsError::ConfigError(format!("cannot start runtime: {}", e)))?;
        let sweeper = Arc::clone(self.api.sweeper());
        let interval = self.config.sweeper.interval();
        let run_on_start = self.config.sweeper.run_on_start;

        runtime.block_on(async move {
            let handle = sweeper.start(interval, run_on_start);
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Cannot listen for Ctrl-C, stopping sweeper");
            }
            info!("Shutdown requested");
            handle.shutdown().await;
        });
        self.api.flush()
    }
}

fn confirm(prompt: &str) -> Result<bool, FsError> {
    use dialoguer::Confirm;
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| FsError::ConfigError(format!("Failed to get user input: {}", e)))
}
