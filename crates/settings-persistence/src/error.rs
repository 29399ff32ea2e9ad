//! Error types for settings persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or saving a settings store.
///
/// Decode failures never show up here: `JsonStore::load` absorbs them and
/// recovers to a default value. Everything below is an I/O or setup failure
/// the host has to handle.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Failed to read a file.
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file.
    #[error("failed to write {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to delete a file.
    #[error("failed to delete {path}: {source}")]
    DeleteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to copy a file to its backup location.
    #[error("failed to back up {path} to {backup}: {source}")]
    BackupError {
        path: PathBuf,
        backup: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or list a directory.
    #[error("directory error at {path}: {source}")]
    DirectoryError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize the stored value.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The empty document `{}` does not decode into the stored type and no
    /// fallback default was supplied.
    #[error("no default value for {path}: {source}")]
    DefaultUnavailable {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// `save` was called before the store was loaded.
    #[error("store at {path} has not been loaded")]
    NotLoaded { path: PathBuf },
}

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;
