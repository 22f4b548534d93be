//! Response queue drain: fetch, persist, acknowledge.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::client::{ApiResult, OrderResponse, PurchaseOrderClient};
use crate::mailbox::Mailbox;

use super::types::{DrainReport, DrainStop, ReconcileError};

/// Pulls order responses from the remote queue into the responses folder.
pub struct Reconciler {
    mailbox: Mailbox,
    client: Arc<dyn PurchaseOrderClient>,
    shutdown: Arc<AtomicBool>,
}

impl Reconciler {
    pub fn new(mailbox: Mailbox, client: Arc<dyn PurchaseOrderClient>) -> Self {
        Self {
            mailbox,
            client,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a shutdown flag; once set, the current pass stops before the
    /// next fetch.
    pub fn with_shutdown_flag(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Drain the queue until it is empty or a fetch or write fails.
    ///
    /// A response is acknowledged only after its file is in place. A failed
    /// acknowledgment is recorded and the drain goes on. A response without
    /// an ack handle is saved and ends the pass.
    pub async fn run_pass(&self) -> DrainReport {
        let mut report = DrainReport::new();
        let mut unacked_handles: HashSet<String> = HashSet::new();

        report.stop = loop {
            if self.shutdown.load(Ordering::Relaxed) {
                debug!("Shutdown requested, ending order response drain");
                break DrainStop::Cancelled;
            }

            let response = match self.client.get_order_response().await {
                ApiResult::Ok(response) => response,
                ApiResult::NotFound => break DrainStop::QueueEmpty,
                ApiResult::Failed(errors) => {
                    let err = ReconcileError::Fetch(errors);
                    error!("{}", err);
                    break DrainStop::Failed(err);
                }
            };

            if response
                .ack_handle
                .as_ref()
                .is_some_and(|handle| unacked_handles.contains(handle))
            {
                warn!(
                    "Order response {} returned again after a failed acknowledgment, retrying next pass",
                    response.order_number
                );
                break DrainStop::Redelivered {
                    order_number: response.order_number,
                };
            }

            let OrderResponse {
                order_number,
                xml,
                ack_handle,
            } = response;

            match self.mailbox.write_response(&order_number, &xml).await {
                Ok(path) => {
                    info!("Saved order response: {}", path.display());
                    report.written.push(path);
                }
                Err(source) => {
                    let err = ReconcileError::Persistence {
                        order_number,
                        source,
                    };
                    error!("{}", err);
                    break DrainStop::Failed(err);
                }
            }

            // Without a handle the item cannot leave the queue, and a queue that
            // serves its head until acknowledged would return it forever.
            let Some(handle) = ack_handle else {
                warn!(
                    "Order response {} has no acknowledgement handle, leaving it in the queue",
                    order_number
                );
                report.unacknowledged += 1;
                break DrainStop::Unacknowledgeable { order_number };
            };

            match self.client.remove_order_response_from_queue(&handle).await {
                ApiResult::Ok(()) => {
                    debug!("Acknowledged order response {}", order_number);
                    report.acknowledged += 1;
                }
                ApiResult::NotFound => {
                    self.record_ack_failure(
                        &mut report,
                        order_number,
                        vec!["not found".to_string()],
                    );
                    unacked_handles.insert(handle);
                }
                ApiResult::Failed(errors) => {
                    self.record_ack_failure(&mut report, order_number, errors);
                    unacked_handles.insert(handle);
                }
            }
        };

        report
    }

    fn record_ack_failure(
        &self,
        report: &mut DrainReport,
        order_number: String,
        errors: Vec<String>,
    ) {
        let err = ReconcileError::Acknowledgment {
            order_number,
            errors,
        };
        warn!("{}", err);
        report.ack_failures.push(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FolderConfig;
    use crate::testing::fixtures::order_response;
    use crate::testing::{MockPurchaseOrderClient, RecordedCall};
    use tempfile::TempDir;

    fn setup() -> (TempDir, Mailbox, Arc<MockPurchaseOrderClient>) {
        let temp = TempDir::new().unwrap();
        let responses = temp.path().join("responses");
        std::fs::create_dir_all(&responses).unwrap();
        let mailbox = Mailbox::new(FolderConfig {
            inbound_orders: temp.path().join("inbound"),
            processed_orders: temp.path().join("processed"),
            failed_orders: temp.path().join("failed"),
            order_responses: responses,
        });
        (temp, mailbox, Arc::new(MockPurchaseOrderClient::new()))
    }

    fn reconciler(mailbox: &Mailbox, client: &Arc<MockPurchaseOrderClient>) -> Reconciler {
        Reconciler::new(
            mailbox.clone(),
            Arc::clone(client) as Arc<dyn PurchaseOrderClient>,
        )
    }

    #[tokio::test]
    async fn test_empty_queue() {
        let (_temp, mailbox, client) = setup();
        let report = reconciler(&mailbox, &client).run_pass().await;

        assert!(matches!(report.stop, DrainStop::QueueEmpty));
        assert!(report.written.is_empty());
        assert_eq!(client.recorded_calls().await, vec![RecordedCall::GetOrderResponse]);
    }

    #[tokio::test]
    async fn test_persists_then_acknowledges() {
        let (_temp, mailbox, client) = setup();
        client
            .queue_response(order_response("PO-1", "<OrderResponse/>", Some("ack/1")))
            .await;

        let report = reconciler(&mailbox, &client).run_pass().await;

        assert_eq!(report.written.len(), 1);
        assert_eq!(report.acknowledged, 1);
        let written = std::fs::read_to_string(&report.written[0]).unwrap();
        assert_eq!(written, "<OrderResponse/>");
        assert_eq!(
            client.recorded_calls().await,
            vec![
                RecordedCall::GetOrderResponse,
                RecordedCall::RemoveOrderResponse {
                    ack_handle: "ack/1".to_string()
                },
                RecordedCall::GetOrderResponse,
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_handle_is_persisted_not_acknowledged() {
        let (_temp, mailbox, client) = setup();
        client
            .queue_response(order_response("PO-2", "<OrderResponse/>", None))
            .await;

        let report = reconciler(&mailbox, &client).run_pass().await;

        assert_eq!(report.written.len(), 1);
        assert_eq!(report.unacknowledged, 1);
        assert_eq!(report.acknowledged, 0);
        assert!(matches!(
            report.stop,
            DrainStop::Unacknowledgeable { ref order_number } if order_number == "PO-2"
        ));
        assert!(client.acknowledged_handles().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_handle_ends_pass_when_queue_keeps_serving_it() {
        let (_temp, mailbox, client) = setup();
        client.set_retain_until_ack(true).await;
        client
            .queue_response(order_response("R1", "<OrderResponse/>", None))
            .await;
        client
            .queue_response(order_response("R2", "<OrderResponse/>", Some("ack/R2")))
            .await;

        let report = reconciler(&mailbox, &client).run_pass().await;

        assert!(matches!(report.stop, DrainStop::Unacknowledgeable { .. }));
        assert_eq!(report.written.len(), 1);
        assert_eq!(report.unacknowledged, 1);
        assert_eq!(
            client.recorded_calls().await,
            vec![RecordedCall::GetOrderResponse]
        );
        assert_eq!(client.queued_responses().await, 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_ends_pass() {
        let (_temp, mailbox, client) = setup();
        client.fail_next_fetch(vec!["HTTP 503".to_string()]).await;
        client
            .queue_response(order_response("PO-3", "<OrderResponse/>", Some("ack/3")))
            .await;

        let report = reconciler(&mailbox, &client).run_pass().await;

        assert!(matches!(
            report.stop,
            DrainStop::Failed(ReconcileError::Fetch(_))
        ));
        assert!(report.written.is_empty());
        assert_eq!(client.queued_responses().await, 1);
    }

    #[tokio::test]
    async fn test_redelivered_after_failed_ack_ends_pass() {
        let (_temp, mailbox, client) = setup();
        client.set_retain_until_ack(true).await;
        client.push_ack_result(ApiResult::failed("HTTP 500")).await;
        client
            .queue_response(order_response("PO-4", "<OrderResponse/>", Some("ack/4")))
            .await;

        let report = reconciler(&mailbox, &client).run_pass().await;

        assert!(matches!(
            report.stop,
            DrainStop::Redelivered { ref order_number } if order_number == "PO-4"
        ));
        assert_eq!(report.written.len(), 1);
        assert_eq!(report.ack_failures.len(), 1);
        assert_eq!(client.queued_responses().await, 1);
    }

    #[tokio::test]
    async fn test_shutdown_flag_stops_before_fetch() {
        let (_temp, mailbox, client) = setup();
        client
            .queue_response(order_response("PO-5", "<OrderResponse/>", Some("ack/5")))
            .await;

        let report = reconciler(&mailbox, &client)
            .with_shutdown_flag(Arc::new(AtomicBool::new(true)))
            .run_pass()
            .await;

        assert!(matches!(report.stop, DrainStop::Cancelled));
        assert!(client.recorded_calls().await.is_empty());
        assert_eq!(client.queued_responses().await, 1);
    }
}
