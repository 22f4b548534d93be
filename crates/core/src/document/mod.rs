//! Inbound document classification.
//!
//! Each XML document dropped into the inbound folder is routed by its root
//! element alone:
//!
//! | Root element    | Message type    | Needs order id |
//! |-----------------|-----------------|----------------|
//! | `Order`         | `NewOrder`      | no             |
//! | `OrderChange`   | `OrderUpdate`   | yes            |
//! | `StatusMessage` | `StatusMessage` | yes            |
//!
//! The order id is the text of the first `ID` or `OrderID` element found
//! anywhere below the root, in document order.

mod classifier;
mod types;

pub use classifier::{
    classify, classify_bytes, extract_order_id, extract_order_id_bytes, scan, validate_xml,
    Document, DocumentScan,
};
pub use types::{DocumentError, MessageType};
