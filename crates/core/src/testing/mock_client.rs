//! Mock purchase order client for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::client::{ApiResult, OrderResponse, PurchaseOrderClient};

/// A call made against the mock, for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    SendOrder { body: Vec<u8> },
    UpdateOrder { order_id: String, body: Vec<u8> },
    SendStatusMessage { order_id: String, body: Vec<u8> },
    GetOrderResponse,
    RemoveOrderResponse { ack_handle: String },
}

/// Mock implementation of the PurchaseOrderClient trait.
///
/// Provides controllable behavior for testing:
/// - Record every call for assertions
/// - Script results for the three send operations and for acknowledgments
/// - Serve order responses from an in-memory queue
/// - Inject fetch failures and panics
///
/// Unscripted sends and acknowledgments succeed; an empty response queue
/// answers `NotFound`.
///
/// # Example
///
/// ```rust,ignore
/// use jakamo_core::testing::{fixtures, MockPurchaseOrderClient};
///
/// let client = MockPurchaseOrderClient::new();
/// client.push_send_result(ApiResult::failed("rejected")).await;
/// client.queue_response(fixtures::order_response("PO-1", "<OrderResponse/>", Some("ack/1"))).await;
///
/// // Run a dispatcher or reconciler against it...
///
/// assert_eq!(client.acknowledged_handles().await, vec!["ack/1"]);
/// ```
#[derive(Debug)]
pub struct MockPurchaseOrderClient {
    /// Recorded calls, in order.
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    /// Scripted results for send_order, update_order and send_status_message.
    send_results: Arc<RwLock<VecDeque<ApiResult<()>>>>,
    /// Scripted results for remove_order_response_from_queue.
    ack_results: Arc<RwLock<VecDeque<ApiResult<()>>>>,
    /// Responses waiting in the remote queue.
    responses: Arc<RwLock<VecDeque<OrderResponse>>>,
    /// If set, the next fetch fails with these errors.
    next_fetch_error: Arc<RwLock<Option<Vec<String>>>>,
    /// Keep a fetched response queued until it is acknowledged.
    retain_until_ack: Arc<RwLock<bool>>,
    /// Panic on the next send operation.
    panic_on_send: Arc<RwLock<bool>>,
    /// Panic on the next fetch.
    panic_on_fetch: Arc<RwLock<bool>>,
}

impl Default for MockPurchaseOrderClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPurchaseOrderClient {
    /// Create a new mock client.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            send_results: Arc::new(RwLock::new(VecDeque::new())),
            ack_results: Arc::new(RwLock::new(VecDeque::new())),
            responses: Arc::new(RwLock::new(VecDeque::new())),
            next_fetch_error: Arc::new(RwLock::new(None)),
            retain_until_ack: Arc::new(RwLock::new(false)),
            panic_on_send: Arc::new(RwLock::new(false)),
            panic_on_fetch: Arc::new(RwLock::new(false)),
        }
    }

    /// Get all recorded calls.
    pub async fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    /// Clear recorded calls.
    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }

    /// Number of send, update and status calls made.
    pub async fn send_count(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    RecordedCall::SendOrder { .. }
                        | RecordedCall::UpdateOrder { .. }
                        | RecordedCall::SendStatusMessage { .. }
                )
            })
            .count()
    }

    /// Ack handles passed to remove_order_response_from_queue, in order.
    pub async fn acknowledged_handles(&self) -> Vec<String> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|call| match call {
                RecordedCall::RemoveOrderResponse { ack_handle } => Some(ack_handle.clone()),
                _ => None,
            })
            .collect()
    }

    /// Script the result of the next unscripted send operation.
    pub async fn push_send_result(&self, result: ApiResult<()>) {
        self.send_results.write().await.push_back(result);
    }

    /// Script the result of the next acknowledgment.
    pub async fn push_ack_result(&self, result: ApiResult<()>) {
        self.ack_results.write().await.push_back(result);
    }

    /// Add a response to the back of the queue.
    pub async fn queue_response(&self, response: OrderResponse) {
        self.responses.write().await.push_back(response);
    }

    /// Number of responses still queued.
    pub async fn queued_responses(&self) -> usize {
        self.responses.read().await.len()
    }

    /// Make the next fetch fail with these errors.
    pub async fn fail_next_fetch(&self, errors: Vec<String>) {
        *self.next_fetch_error.write().await = Some(errors);
    }

    /// Model a queue that hands out the same item until it is acknowledged.
    ///
    /// Responses without an ack handle are never removed in this mode.
    pub async fn set_retain_until_ack(&self, retain: bool) {
        *self.retain_until_ack.write().await = retain;
    }

    /// Panic inside the next send operation.
    pub async fn panic_on_next_send(&self) {
        *self.panic_on_send.write().await = true;
    }

    /// Panic inside the next fetch.
    pub async fn panic_on_next_fetch(&self) {
        *self.panic_on_fetch.write().await = true;
    }

    async fn record(&self, call: RecordedCall) {
        self.calls.write().await.push(call);
    }

    async fn next_send_result(&self) -> ApiResult<()> {
        let panic = std::mem::take(&mut *self.panic_on_send.write().await);
        if panic {
            panic!("mock send panicked");
        }
        self.send_results
            .write()
            .await
            .pop_front()
            .unwrap_or(ApiResult::Ok(()))
    }
}

#[async_trait]
impl PurchaseOrderClient for MockPurchaseOrderClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send_order(&self, body: Vec<u8>) -> ApiResult<()> {
        self.record(RecordedCall::SendOrder { body }).await;
        self.next_send_result().await
    }

    async fn update_order(&self, order_id: &str, body: Vec<u8>) -> ApiResult<()> {
        self.record(RecordedCall::UpdateOrder {
            order_id: order_id.to_string(),
            body,
        })
        .await;
        self.next_send_result().await
    }

    async fn send_status_message(&self, order_id: &str, body: Vec<u8>) -> ApiResult<()> {
        self.record(RecordedCall::SendStatusMessage {
            order_id: order_id.to_string(),
            body,
        })
        .await;
        self.next_send_result().await
    }

    async fn get_order_response(&self) -> ApiResult<OrderResponse> {
        self.record(RecordedCall::GetOrderResponse).await;

        let panic = std::mem::take(&mut *self.panic_on_fetch.write().await);
        if panic {
            panic!("mock fetch panicked");
        }
        if let Some(errors) = self.next_fetch_error.write().await.take() {
            return ApiResult::Failed(errors);
        }

        let retain = *self.retain_until_ack.read().await;
        let mut responses = self.responses.write().await;
        let response = if retain {
            responses.front().cloned()
        } else {
            responses.pop_front()
        };
        match response {
            Some(response) => ApiResult::Ok(response),
            None => ApiResult::NotFound,
        }
    }

    async fn remove_order_response_from_queue(&self, ack_handle: &str) -> ApiResult<()> {
        self.record(RecordedCall::RemoveOrderResponse {
            ack_handle: ack_handle.to_string(),
        })
        .await;

        let result = self
            .ack_results
            .write()
            .await
            .pop_front()
            .unwrap_or(ApiResult::Ok(()));

        if result.is_ok() && *self.retain_until_ack.read().await {
            self.responses
                .write()
                .await
                .retain(|r| r.ack_handle.as_deref() != Some(ack_handle));
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::order_response;

    #[tokio::test]
    async fn test_unscripted_calls_succeed() {
        let client = MockPurchaseOrderClient::new();
        assert!(client.send_order(b"<Order/>".to_vec()).await.is_ok());
        assert_eq!(client.get_order_response().await, ApiResult::NotFound);
        assert!(client.remove_order_response_from_queue("x").await.is_ok());
        assert_eq!(client.recorded_calls().await.len(), 3);
        assert_eq!(client.send_count().await, 1);
    }

    #[tokio::test]
    async fn test_scripted_results_in_order() {
        let client = MockPurchaseOrderClient::new();
        client.push_send_result(ApiResult::NotFound).await;
        client.push_send_result(ApiResult::failed("nope")).await;

        assert_eq!(client.update_order("1", vec![]).await, ApiResult::NotFound);
        assert_eq!(
            client.send_status_message("1", vec![]).await,
            ApiResult::failed("nope")
        );
        assert!(client.send_order(vec![]).await.is_ok());
    }

    #[tokio::test]
    async fn test_retain_until_ack() {
        let client = MockPurchaseOrderClient::new();
        client.set_retain_until_ack(true).await;
        client.push_ack_result(ApiResult::failed("HTTP 500")).await;
        client
            .queue_response(order_response("PO-1", "<R/>", Some("ack/1")))
            .await;

        let first = client.get_order_response().await.ok().unwrap();
        assert!(!client
            .remove_order_response_from_queue("ack/1")
            .await
            .is_ok());
        let again = client.get_order_response().await.ok().unwrap();
        assert_eq!(first, again);

        assert!(client
            .remove_order_response_from_queue("ack/1")
            .await
            .is_ok());
        assert_eq!(client.get_order_response().await, ApiResult::NotFound);
    }
}
