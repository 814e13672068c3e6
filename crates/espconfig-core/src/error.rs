//! Error types for the configuration store and its collaborators.

use thiserror::Error;

/// Errors reported by a [`Filesystem`](crate::Filesystem) implementation.
#[derive(Debug, Error)]
pub enum FsError {
    /// The filesystem could not be mounted.
    #[error("Filesystem mount failed: {0}")]
    MountFailed(String),

    /// No file exists at the given path.
    #[error("File not found: {0}")]
    NotFound(String),

    /// Any other I/O failure while opening, reading, writing or closing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons a line of a config file is rejected during load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The line has no `=` separating name and value.
    #[error("Missing delimiter")]
    MissingDelimiter,

    /// The line starts with the delimiter.
    #[error("Empty entry name")]
    EmptyName,
}

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The backing filesystem was never mounted.
    #[error("Filesystem unavailable")]
    FilesystemUnavailable,

    /// Reading the backing file failed.
    #[error("Failed to read {path}: {source}")]
    ReadFailure { path: String, source: FsError },

    /// Opening, writing or closing the backing file failed.
    #[error("Failed to write {path}: {source}")]
    WriteFailure { path: String, source: FsError },
}
