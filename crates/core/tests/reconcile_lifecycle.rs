//! Reconciliation loop integration tests.
//!
//! These tests drain a scripted response queue into a real responses folder:
//! fetch -> persist -> acknowledge, until the queue is empty or a step fails.

use std::sync::Arc;

use tempfile::TempDir;

use jakamo_core::{
    config::FolderConfig,
    reconcile::{DrainStop, ReconcileError},
    testing::{fixtures, MockPurchaseOrderClient},
    ApiResult, Mailbox, Reconciler,
};

struct TestHarness {
    mailbox: Mailbox,
    client: Arc<MockPurchaseOrderClient>,
    _temp_dir: TempDir,
}

impl TestHarness {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mailbox = Mailbox::new(FolderConfig {
            inbound_orders: temp_dir.path().join("inbound"),
            processed_orders: temp_dir.path().join("processed"),
            failed_orders: temp_dir.path().join("failed"),
            order_responses: temp_dir.path().join("responses"),
        });
        mailbox
            .ensure_directories()
            .await
            .expect("Failed to create mailbox folders");

        Self {
            mailbox,
            client: Arc::new(MockPurchaseOrderClient::new()),
            _temp_dir: temp_dir,
        }
    }

    fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.mailbox.clone(), self.client.clone())
    }

    async fn queue(&self, order_number: &str, ack: Option<&str>) {
        self.client
            .queue_response(fixtures::order_response(
                order_number,
                &fixtures::order_response_xml(order_number),
                ack,
            ))
            .await;
    }

    fn response_exists(&self, order_number: &str) -> bool {
        self.mailbox
            .folders()
            .order_responses
            .join(format!("{}.xml", order_number))
            .exists()
    }
}

#[tokio::test]
async fn test_two_responses_then_empty() {
    let harness = TestHarness::new().await;
    harness.queue("R1", Some("ack/R1")).await;
    harness.queue("R2", Some("ack/R2")).await;

    let report = harness.reconciler().run_pass().await;

    assert!(matches!(report.stop, DrainStop::QueueEmpty));
    assert_eq!(report.written.len(), 2);
    assert_eq!(report.acknowledged, 2);
    assert!(harness.response_exists("R1"));
    assert!(harness.response_exists("R2"));
    assert_eq!(
        harness.client.acknowledged_handles().await,
        vec!["ack/R1", "ack/R2"]
    );

    let content = std::fs::read_to_string(&report.written[0]).unwrap();
    assert_eq!(content, fixtures::order_response_xml("R1"));
}

#[tokio::test]
async fn test_ack_failure_keeps_file_and_continues() {
    let harness = TestHarness::new().await;
    harness.queue("R1", Some("ack/R1")).await;
    harness.queue("R2", Some("ack/R2")).await;
    harness
        .client
        .push_ack_result(ApiResult::failed("HTTP 500: busy"))
        .await;

    let report = harness.reconciler().run_pass().await;

    assert!(matches!(report.stop, DrainStop::QueueEmpty));
    assert!(harness.response_exists("R1"));
    assert!(harness.response_exists("R2"));
    assert_eq!(report.acknowledged, 1);
    assert_eq!(report.ack_failures.len(), 1);
    assert!(matches!(
        &report.ack_failures[0],
        ReconcileError::Acknowledgment { order_number, .. } if order_number == "R1"
    ));
    assert_eq!(
        harness.client.acknowledged_handles().await,
        vec!["ack/R1", "ack/R2"]
    );
}

#[tokio::test]
async fn test_persistence_fault_stops_without_ack() {
    let harness = TestHarness::new().await;
    harness.queue("R1", Some("ack/R1")).await;
    harness
        .client
        .queue_response(fixtures::order_response(
            "R2",
            "<OrderResponse><Open></OrderResponse>",
            Some("ack/R2"),
        ))
        .await;
    harness.queue("R3", Some("ack/R3")).await;

    let report = harness.reconciler().run_pass().await;

    assert!(matches!(
        &report.stop,
        DrainStop::Failed(ReconcileError::Persistence { order_number, .. }) if order_number == "R2"
    ));
    assert!(harness.response_exists("R1"));
    assert!(!harness.response_exists("R2"));
    assert!(!harness.response_exists("R3"));
    assert_eq!(harness.client.acknowledged_handles().await, vec!["ack/R1"]);
    assert_eq!(harness.client.queued_responses().await, 1);
}

#[tokio::test]
async fn test_unsafe_order_number_is_a_persistence_fault() {
    let harness = TestHarness::new().await;
    harness.queue("../escape", Some("ack/x")).await;

    let report = harness.reconciler().run_pass().await;

    assert!(matches!(
        report.stop,
        DrainStop::Failed(ReconcileError::Persistence { .. })
    ));
    assert!(report.written.is_empty());
    assert!(harness.client.acknowledged_handles().await.is_empty());
}

#[tokio::test]
async fn test_redelivery_overwrites_existing_file() {
    let harness = TestHarness::new().await;
    let path = harness.mailbox.folders().order_responses.join("R1.xml");
    std::fs::write(&path, "<OrderResponse>stale</OrderResponse>").unwrap();

    harness.queue("R1", Some("ack/R1")).await;
    let report = harness.reconciler().run_pass().await;

    assert_eq!(report.acknowledged, 1);
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        fixtures::order_response_xml("R1")
    );
    // No temp files left behind.
    let names: Vec<_> = std::fs::read_dir(&harness.mailbox.folders().order_responses)
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(names.len(), 1);
}

#[tokio::test]
async fn test_failed_ack_is_retried_next_pass() {
    let harness = TestHarness::new().await;
    harness.client.set_retain_until_ack(true).await;
    harness.client.push_ack_result(ApiResult::NotFound).await;
    harness.queue("R1", Some("ack/R1")).await;

    let first = harness.reconciler().run_pass().await;
    assert!(matches!(first.stop, DrainStop::Redelivered { .. }));
    assert_eq!(first.acknowledged, 0);

    let second = harness.reconciler().run_pass().await;
    assert!(matches!(second.stop, DrainStop::QueueEmpty));
    assert_eq!(second.acknowledged, 1);
    assert!(harness.response_exists("R1"));
}
