//! Tooling
//!
//! Terminal front end over the collaborator API: argument parsing, command
//! dispatch and output rendering.

pub mod cli;
pub mod format;

pub use cli::{Cli, CliContext, Commands, ConfigCommands, TrashCommands};
pub use format::OutputFormat;
