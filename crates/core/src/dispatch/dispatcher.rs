//! Inbound folder sweep: classify, deliver, relocate.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::client::{ApiResult, PurchaseOrderClient};
use crate::document::{Document, MessageType};
use crate::fault::catch_panic;
use crate::mailbox::{Mailbox, MailboxError};

use super::types::{DispatchError, DispatchReport, Disposition, FileReport};

/// Delivers inbound order documents to the purchase order API.
pub struct Dispatcher {
    mailbox: Mailbox,
    client: Arc<dyn PurchaseOrderClient>,
    shutdown: Arc<AtomicBool>,
}

impl Dispatcher {
    pub fn new(mailbox: Mailbox, client: Arc<dyn PurchaseOrderClient>) -> Self {
        Self {
            mailbox,
            client,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a shutdown flag; once set, the current pass stops before the
    /// next file.
    pub fn with_shutdown_flag(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Sweep the inbound folder once.
    ///
    /// Only listing the folder can fail the pass. Every listed file is
    /// handled on its own and ends up in the processed or failed folder.
    pub async fn run_pass(&self) -> Result<DispatchReport, MailboxError> {
        let files = self.mailbox.list_inbound().await?;
        let mut report = DispatchReport::default();

        if files.is_empty() {
            return Ok(report);
        }

        info!("Found {} XML files to process", files.len());

        for (idx, path) in files.iter().enumerate() {
            if self.shutdown.load(Ordering::Relaxed) {
                report.skipped = files.len() - idx;
                info!(
                    "Shutdown requested, leaving {} files for the next run",
                    report.skipped
                );
                break;
            }
            report.files.push(self.handle_file(path).await);
        }

        Ok(report)
    }

    /// Deliver one file and move it to processed or failed.
    async fn handle_file(&self, path: &Path) -> FileReport {
        let file_name = display_name(path);
        info!("Processing: {}", file_name);

        let outcome = match catch_panic(self.deliver(path)).await {
            Ok(result) => result,
            Err(panic) => Err(DispatchError::Panicked(panic)),
        };

        let (disposition, error, moved) = match outcome {
            Ok(()) => (
                Disposition::Processed,
                None,
                self.mailbox.move_to_processed(path).await,
            ),
            Err(e) => {
                error!("Error processing {}: {}", file_name, e);
                (
                    Disposition::Failed,
                    Some(e.to_string()),
                    self.mailbox.move_to_failed(path).await,
                )
            }
        };

        let (destination, relocation_error) = match moved {
            Ok(destination) => {
                match disposition {
                    Disposition::Processed => info!("Successfully processed: {}", file_name),
                    Disposition::Failed => warn!("Failed to process: {}", file_name),
                }
                (Some(destination), None)
            }
            Err(e) => {
                error!("Failed to relocate {}: {}", file_name, e);
                (None, Some(e.to_string()))
            }
        };

        FileReport {
            source: path.to_path_buf(),
            disposition,
            destination,
            error,
            relocation_error,
        }
    }

    /// Classify the document and send it to the matching API operation.
    async fn deliver(&self, path: &Path) -> Result<(), DispatchError> {
        let document = Document::load(path).await?;
        let message_type = document.message_type;
        debug!(
            "Detected message type for {}: {}",
            document.file_name(),
            message_type
        );

        let result = match message_type {
            MessageType::NewOrder => self.client.send_order(document.body).await,
            MessageType::OrderUpdate => {
                let order_id = require_order_id(document.order_id, message_type)?;
                self.client.update_order(&order_id, document.body).await
            }
            MessageType::StatusMessage => {
                let order_id = require_order_id(document.order_id, message_type)?;
                self.client
                    .send_status_message(&order_id, document.body)
                    .await
            }
        };

        match result {
            ApiResult::Ok(()) => Ok(()),
            ApiResult::NotFound => Err(DispatchError::RemoteNotFound),
            ApiResult::Failed(errors) => {
                error!("API Error: {}", errors.join(", "));
                Err(DispatchError::Remote(errors))
            }
        }
    }
}

fn require_order_id(
    order_id: Option<String>,
    message_type: MessageType,
) -> Result<String, DispatchError> {
    order_id.ok_or(DispatchError::MissingOrderId { message_type })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
