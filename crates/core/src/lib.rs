pub mod client;
pub mod config;
pub mod dispatch;
pub mod document;
pub mod fault;
pub mod mailbox;
pub mod reconcile;
pub mod service;
pub mod testing;

pub use client::{ApiResult, HttpPurchaseOrderClient, OrderResponse, PurchaseOrderClient};
pub use config::{
    find_config, load_config, load_config_from_str, validate_config, Config, ConfigError,
    SanitizedConfig,
};
pub use dispatch::{DispatchReport, Dispatcher};
pub use document::{classify, extract_order_id, MessageType};
pub use mailbox::{Mailbox, MailboxError};
pub use reconcile::{DrainReport, Reconciler};
pub use service::{ConnectorService, PollIntervals, ServiceStatus};
