//! Types for the reconciliation loop.

use std::path::PathBuf;

use thiserror::Error;

use crate::mailbox::MailboxError;

/// A failure while draining the response queue.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Fetching the next response failed.
    #[error("failed to fetch order response: {}", .0.join(", "))]
    Fetch(Vec<String>),

    /// The response could not be written locally; it was not acknowledged.
    #[error("failed to persist order response {order_number}: {source}")]
    Persistence {
        order_number: String,
        #[source]
        source: MailboxError,
    },

    /// Removing a persisted response from the queue failed.
    #[error("failed to acknowledge order response {order_number}: {}", .errors.join(", "))]
    Acknowledgment {
        order_number: String,
        errors: Vec<String>,
    },
}

/// Why a drain pass ended.
#[derive(Debug)]
pub enum DrainStop {
    /// The queue reported no more responses.
    QueueEmpty,
    /// A fetch or persistence failure ended the pass early.
    Failed(ReconcileError),
    /// A response whose acknowledgment already failed in this pass came
    /// back; it is left for the next pass.
    Redelivered { order_number: String },
    /// A response without an ack handle was saved; it cannot be removed
    /// from the queue, so the pass ends after it.
    Unacknowledgeable { order_number: String },
    /// Shutdown was requested between responses.
    Cancelled,
}

impl DrainStop {
    /// Whether the pass drained the queue without an error.
    pub fn is_clean(&self) -> bool {
        matches!(self, DrainStop::QueueEmpty | DrainStop::Cancelled)
    }
}

/// Summary of one drain pass.
#[derive(Debug)]
pub struct DrainReport {
    /// Response files written, in fetch order.
    pub written: Vec<PathBuf>,
    /// Responses removed from the queue.
    pub acknowledged: usize,
    /// Responses persisted without an ack handle.
    pub unacknowledged: usize,
    /// Acknowledgments that failed; the files are kept.
    pub ack_failures: Vec<ReconcileError>,
    pub stop: DrainStop,
}

impl DrainReport {
    pub(crate) fn new() -> Self {
        Self {
            written: Vec::new(),
            acknowledged: 0,
            unacknowledged: 0,
            ack_failures: Vec::new(),
            stop: DrainStop::QueueEmpty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReconcileError::Fetch(vec!["HTTP 500: down".to_string()]);
        assert_eq!(
            err.to_string(),
            "failed to fetch order response: HTTP 500: down"
        );

        let err = ReconcileError::Acknowledgment {
            order_number: "PO-7".to_string(),
            errors: vec!["gone".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "failed to acknowledge order response PO-7: gone"
        );

        let err = ReconcileError::Persistence {
            order_number: "../x".to_string(),
            source: MailboxError::InvalidOrderNumber("../x".to_string()),
        };
        assert!(err.to_string().starts_with("failed to persist order response ../x"));
    }

    #[test]
    fn test_clean_stops() {
        assert!(DrainStop::QueueEmpty.is_clean());
        assert!(DrainStop::Cancelled.is_clean());
        assert!(!DrainStop::Redelivered {
            order_number: "1".into()
        }
        .is_clean());
        assert!(!DrainStop::Unacknowledgeable {
            order_number: "1".into()
        }
        .is_clean());
        assert!(!DrainStop::Failed(ReconcileError::Fetch(vec![])).is_clean());
    }
}
