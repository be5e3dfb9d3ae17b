use std::fmt;

use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error from the durable medium.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error from a file-backed medium.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A state blob failed structural validation.
    #[error("Invalid application state: {0}")]
    InvalidState(String),

    /// The storage medium cannot be reached in this process.
    #[error("Storage medium unavailable")]
    Unavailable,

    /// The key/value medium refused a write for lack of space.
    #[error("Storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: u64, quota: u64 },

    /// Called from a thread without a tokio runtime; the write stays pending.
    #[error("No async runtime on this thread; write deferred until flush")]
    NoRuntime,

    /// Medium key that cannot be mapped to storage.
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// A blocking database task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Coarse classification used when reporting failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Unavailable,
    Capacity,
    Query,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Capacity => "capacity",
            ErrorKind::Query => "query",
        };
        f.write_str(name)
    }
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::InvalidState(_) | StoreError::Serialization(_) => ErrorKind::Validation,
            StoreError::Unavailable
            | StoreError::NoRuntime
            | StoreError::NoDataDir
            | StoreError::Migration(_) => ErrorKind::Unavailable,
            StoreError::QuotaExceeded { .. } => ErrorKind::Capacity,
            StoreError::Sqlite(_)
            | StoreError::Io(_)
            | StoreError::InvalidKey(_)
            | StoreError::Task(_) => ErrorKind::Query,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
