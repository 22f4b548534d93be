//! Connector service: the two poll loops under one shutdown signal.
//!
//! - **Dispatch**: inbound folder to the purchase order API
//! - **Reconciliation**: order response queue to the responses folder
//!
//! Each pass runs behind a fault barrier. Neither an error nor a panic in a
//! pass ends its loop; only `stop()` does.

mod runner;
mod types;

pub use runner::ConnectorService;
pub use types::{LoopStatus, PollIntervals, ServiceStatus};
