//! Types for the dispatch loop.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::document::{DocumentError, MessageType};

/// Why a single inbound file was not delivered.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Unreadable, malformed or unrecognised document.
    #[error("classification failed: {0}")]
    Classification(#[from] DocumentError),

    /// Update or status document without an order id.
    #[error("{message_type} document has no ID or OrderID element")]
    MissingOrderId { message_type: MessageType },

    /// The API rejected the document.
    #[error("remote call failed: {}", .0.join(", "))]
    Remote(Vec<String>),

    /// The API reported the target order as unknown.
    #[error("remote call failed: order not found")]
    RemoteNotFound,

    /// Handling this file panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

/// Folder a file was sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Processed,
    Failed,
}

/// What happened to one inbound file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    /// Path the file was picked up from.
    pub source: PathBuf,
    /// Target folder, decided by the delivery outcome.
    pub disposition: Disposition,
    /// Where the file ended up; `None` if the move failed and the file is
    /// still in the inbound folder.
    pub destination: Option<PathBuf>,
    /// Delivery error, for failed files.
    pub error: Option<String>,
    /// Relocation error, if the move failed.
    pub relocation_error: Option<String>,
}

/// Summary of one sweep over the inbound folder.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    pub files: Vec<FileReport>,
    /// Files left in the inbound folder because shutdown was requested.
    pub skipped: usize,
}

impl DispatchReport {
    pub fn processed_count(&self) -> usize {
        self.count(Disposition::Processed)
    }

    pub fn failed_count(&self) -> usize {
        self.count(Disposition::Failed)
    }

    /// Files whose move out of the inbound folder failed.
    pub fn relocation_failures(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.relocation_error.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.skipped == 0
    }

    fn count(&self, disposition: Disposition) -> usize {
        self.files
            .iter()
            .filter(|f| f.disposition == disposition)
            .count()
    }
}
