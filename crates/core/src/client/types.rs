//! Types for purchase order API operations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised inside a client implementation.
///
/// These never cross the `PurchaseOrderClient` boundary as errors: they are
/// folded into `ApiResult::Failed` so callers handle one result shape.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timeout")]
    Timeout,
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else if e.is_connect() {
            ClientError::ConnectionFailed(e.to_string())
        } else if e.is_decode() {
            ClientError::InvalidResponse(e.to_string())
        } else {
            ClientError::ApiError(e.to_string())
        }
    }
}

/// Outcome of a remote call.
///
/// `NotFound` is a distinct outcome rather than an error: for the response
/// queue it means the queue is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiResult<T> {
    Ok(T),
    NotFound,
    Failed(Vec<String>),
}

impl<T> ApiResult<T> {
    /// A failure carrying a single message.
    pub fn failed(message: impl Into<String>) -> Self {
        ApiResult::Failed(vec![message.into()])
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ApiResult::Ok(_))
    }

    /// Error messages; empty unless `Failed`.
    pub fn errors(&self) -> &[String] {
        match self {
            ApiResult::Failed(errors) => errors,
            _ => &[],
        }
    }

    pub fn ok(self) -> Option<T> {
        match self {
            ApiResult::Ok(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> From<ClientError> for ApiResult<T> {
    fn from(e: ClientError) -> Self {
        ApiResult::failed(e.to_string())
    }
}

/// A response document waiting in the remote queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResponse {
    /// Order number; names the local file `<order_number>.xml`.
    pub order_number: String,
    /// XML payload.
    pub xml: Vec<u8>,
    /// Handle used to remove this item from the queue. Items without one
    /// are persisted but cannot be acknowledged.
    pub ack_handle: Option<String>,
}

/// Remote purchase order API.
#[async_trait]
pub trait PurchaseOrderClient: Send + Sync {
    /// Returns the name of this client implementation.
    fn name(&self) -> &str;

    /// Submit a new order document.
    async fn send_order(&self, body: Vec<u8>) -> ApiResult<()>;

    /// Submit a change to an existing order.
    async fn update_order(&self, order_id: &str, body: Vec<u8>) -> ApiResult<()>;

    /// Submit a status message for an existing order.
    async fn send_status_message(&self, order_id: &str, body: Vec<u8>) -> ApiResult<()>;

    /// Fetch the next queued order response. `NotFound` when the queue is empty.
    async fn get_order_response(&self) -> ApiResult<OrderResponse>;

    /// Remove a fetched response from the queue.
    async fn remove_order_response_from_queue(&self, ack_handle: &str) -> ApiResult<()>;
}
