//! Types for document classification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or classifying a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The file could not be read.
    #[error("Failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Document is not UTF-8.
    #[error("Document is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// Document is not well-formed XML.
    #[error("Malformed XML at byte {position}: {reason}")]
    Malformed { position: u64, reason: String },

    /// Document has no root element.
    #[error("Document has no root element")]
    NoRoot,

    /// Document has more than one top-level element.
    #[error("Document has more than one root element")]
    MultipleRoots,

    /// Root element is not one of the recognised message roots.
    #[error("Unknown root element: {0}")]
    UnknownRoot(String),
}

/// Kind of inbound message, decided by the document's root element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// `<Order>`: a new purchase order.
    NewOrder,
    /// `<OrderChange>`: a change to an existing order.
    OrderUpdate,
    /// `<StatusMessage>`: a status update for an existing order.
    StatusMessage,
}

impl MessageType {
    /// Map a root element local name to its message type.
    pub fn from_root(root: &str) -> Result<Self, DocumentError> {
        match root {
            "Order" => Ok(Self::NewOrder),
            "OrderChange" => Ok(Self::OrderUpdate),
            "StatusMessage" => Ok(Self::StatusMessage),
            other => Err(DocumentError::UnknownRoot(other.to_string())),
        }
    }

    /// Whether dispatching this message needs an order id.
    pub fn requires_order_id(&self) -> bool {
        !matches!(self, Self::NewOrder)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewOrder => "new_order",
            Self::OrderUpdate => "order_update",
            Self::StatusMessage => "status_message",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_root() {
        assert_eq!(MessageType::from_root("Order").unwrap(), MessageType::NewOrder);
        assert_eq!(
            MessageType::from_root("OrderChange").unwrap(),
            MessageType::OrderUpdate
        );
        assert_eq!(
            MessageType::from_root("StatusMessage").unwrap(),
            MessageType::StatusMessage
        );
    }

    #[test]
    fn test_from_root_is_case_sensitive() {
        let err = MessageType::from_root("order").unwrap_err();
        assert!(matches!(err, DocumentError::UnknownRoot(ref r) if r == "order"));
        assert_eq!(err.to_string(), "Unknown root element: order");
    }

    #[test]
    fn test_requires_order_id() {
        assert!(!MessageType::NewOrder.requires_order_id());
        assert!(MessageType::OrderUpdate.requires_order_id());
        assert!(MessageType::StatusMessage.requires_order_id());
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&MessageType::OrderUpdate).unwrap();
        assert_eq!(json, "\"order_update\"");
        assert_eq!(MessageType::StatusMessage.to_string(), "status_message");
    }
}
