//! Error types for the virtual filesystem.

use crate::types::TrashEntryId;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use thiserror::Error;

/// Failures of the backing relational store
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Errors surfaced to collaborators
///
/// Everything except `StorageUnavailable` and `ConfigError` is recoverable and
/// meant to be shown to the user verbatim.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid parent: {0} is not a directory")]
    InvalidParent(String),

    #[error("not a file: {0}")]
    NotAFile(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("cannot restore trash entry {id}: no free name for '{name}' in {parent}")]
    RestoreConflict {
        id: TrashEntryId,
        name: String,
        parent: String,
    },

    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl FsError {
    /// Whether the caller can surface this to the user and carry on
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, FsError::StorageUnavailable(_) | FsError::ConfigError(_))
    }
}

impl From<sled::Error> for FsError {
    fn from(err: sled::Error) -> Self {
        FsError::StorageUnavailable(StorageError::Sled(err))
    }
}

impl From<bincode::Error> for FsError {
    fn from(err: bincode::Error) -> Self {
        FsError::StorageUnavailable(StorageError::Codec(err))
    }
}

impl From<config::ConfigError> for FsError {
    fn from(err: config::ConfigError) -> Self {
        FsError::ConfigError(err.to_string())
    }
}

impl From<TransactionError<FsError>> for FsError {
    fn from(err: TransactionError<FsError>) -> Self {
        match err {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => FsError::StorageUnavailable(StorageError::Sled(e)),
        }
    }
}

/// Lets `?` abort a transaction closure with a domain error.
impl From<FsError> for ConflictableTransactionError<FsError> {
    fn from(err: FsError) -> Self {
        ConflictableTransactionError::Abort(err)
    }
}
