//! Error types for the mailbox module.

use std::path::PathBuf;
use thiserror::Error;

use crate::document::DocumentError;

/// Errors that can occur while touching the mailbox folders.
#[derive(Debug, Error)]
pub enum MailboxError {
    /// Failed to create a mailbox folder.
    #[error("Failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to list a folder.
    #[error("Failed to list directory: {path}")]
    ListFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source path has no file name component.
    #[error("Path has no file name: {path}")]
    NoFileName { path: PathBuf },

    /// Failed to move/rename file.
    #[error("Failed to move file from {source} to {destination}")]
    MoveFailed {
        source: PathBuf,
        destination: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Failed to write a response file.
    #[error("Failed to write {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Order number cannot be used as a file name.
    #[error("Invalid order number for a file name: {0:?}")]
    InvalidOrderNumber(String),

    /// Response payload is not well-formed XML.
    #[error("Invalid response payload: {0}")]
    InvalidPayload(#[from] DocumentError),
}

impl MailboxError {
    /// Creates a move failed error.
    pub fn move_failed(source: PathBuf, destination: PathBuf, error: std::io::Error) -> Self {
        Self::MoveFailed {
            source,
            destination,
            error,
        }
    }

    /// Creates a write failed error.
    pub fn write_failed(path: PathBuf, error: std::io::Error) -> Self {
        Self::WriteFailed { path, error }
    }
}
