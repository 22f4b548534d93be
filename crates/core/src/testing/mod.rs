//! Testing utilities and a mock purchase order client.
//!
//! # Example
//!
//! ```rust,ignore
//! use jakamo_core::testing::{fixtures, MockPurchaseOrderClient};
//!
//! let client = Arc::new(MockPurchaseOrderClient::new());
//! client.queue_response(fixtures::order_response("PO-1", "<OrderResponse/>", Some("ack/1"))).await;
//!
//! let reconciler = Reconciler::new(mailbox, client.clone());
//! reconciler.run_pass().await;
//! ```

mod mock_client;

pub use mock_client::{MockPurchaseOrderClient, RecordedCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::client::OrderResponse;

    /// Create an order response as the remote queue would hand it out.
    pub fn order_response(order_number: &str, xml: &str, ack_handle: Option<&str>) -> OrderResponse {
        OrderResponse {
            order_number: order_number.to_string(),
            xml: xml.as_bytes().to_vec(),
            ack_handle: ack_handle.map(str::to_string),
        }
    }

    /// A minimal new order document.
    pub fn new_order_xml(buyer: &str) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <Order>\n  <Buyer>{}</Buyer>\n  <Lines>\n    <Line><Item>A-1</Item><Quantity>2</Quantity></Line>\n  </Lines>\n</Order>\n",
            buyer
        )
    }

    /// An order change document for `order_id`.
    pub fn order_change_xml(order_id: &str) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <OrderChange>\n  <Header><ID>{}</ID></Header>\n  <Lines/>\n</OrderChange>\n",
            order_id
        )
    }

    /// A status message document for `order_id`.
    pub fn status_message_xml(order_id: &str, status: &str) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <StatusMessage>\n  <OrderID>{}</OrderID>\n  <Status>{}</Status>\n</StatusMessage>\n",
            order_id, status
        )
    }

    /// A minimal order response payload.
    pub fn order_response_xml(order_number: &str) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <OrderResponse>\n  <OrderNumber>{}</OrderNumber>\n  <Accepted>true</Accepted>\n</OrderResponse>\n",
            order_number
        )
    }
}
