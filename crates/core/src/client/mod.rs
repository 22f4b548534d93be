//! Remote purchase order API abstraction.
//!
//! This module provides the `PurchaseOrderClient` trait the dispatch and
//! reconciliation loops talk to, and an HTTPS implementation authenticated
//! with OAuth2 client credentials.

mod http;
mod types;

pub use http::HttpPurchaseOrderClient;
pub use types::*;
