//! Connector service implementation.
//!
//! Runs the dispatch and reconciliation loops as two tokio tasks:
//! - Dispatch: sweeps the inbound folder every `intervals.dispatch`
//! - Reconciliation: drains the response queue every `intervals.reconcile`

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::client::PurchaseOrderClient;
use crate::config::PollingConfig;
use crate::dispatch::Dispatcher;
use crate::fault::catch_panic;
use crate::mailbox::Mailbox;
use crate::reconcile::{DrainStop, Reconciler};

use super::types::{LoopStats, PollIntervals, ServiceStatus};

/// Drives the dispatch and reconciliation loops.
pub struct ConnectorService {
    dispatcher: Arc<Dispatcher>,
    reconciler: Arc<Reconciler>,
    intervals: PollIntervals,

    // Runtime state
    running: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    dispatch_stats: Arc<LoopStats>,
    reconcile_stats: Arc<LoopStats>,
}

impl ConnectorService {
    /// Create a service from a dispatcher and a reconciler.
    ///
    /// Both are given the service's shutdown flag, so `stop()` also ends a
    /// pass between items.
    pub fn new(dispatcher: Dispatcher, reconciler: Reconciler, intervals: PollIntervals) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let shutdown = Arc::new(AtomicBool::new(false));

        Self {
            dispatcher: Arc::new(dispatcher.with_shutdown_flag(Arc::clone(&shutdown))),
            reconciler: Arc::new(reconciler.with_shutdown_flag(Arc::clone(&shutdown))),
            intervals,
            running: Arc::new(AtomicBool::new(false)),
            shutdown,
            shutdown_tx,
            handles: Mutex::new(Vec::new()),
            dispatch_stats: Arc::new(LoopStats::default()),
            reconcile_stats: Arc::new(LoopStats::default()),
        }
    }

    /// Wire both loops to one mailbox and one client.
    pub fn from_parts(
        mailbox: Mailbox,
        client: Arc<dyn PurchaseOrderClient>,
        polling: &PollingConfig,
    ) -> Self {
        Self::new(
            Dispatcher::new(mailbox.clone(), Arc::clone(&client)),
            Reconciler::new(mailbox, client),
            PollIntervals::from(polling),
        )
    }

    /// Start both loops (spawns background tasks).
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Connector service already running");
            return;
        }

        info!(
            "Starting connector service (dispatch every {}s, reconcile every {}s)",
            self.intervals.dispatch.as_secs(),
            self.intervals.reconcile.as_secs()
        );
        self.shutdown.store(false, Ordering::SeqCst);

        let dispatch = self.spawn_dispatch_loop();
        let reconcile = self.spawn_reconcile_loop();
        self.handles.lock().await.extend([dispatch, reconcile]);

        info!("Connector service started");
    }

    /// Stop both loops and wait for them to finish.
    ///
    /// A pass in progress ends after its current file or queue item.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Connector service not running");
            return;
        }

        info!("Stopping connector service");

        self.shutdown.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());

        let handles: Vec<_> = self.handles.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                error!("Poll loop task failed: {}", e);
            }
        }

        info!("Connector service stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Get current service status.
    pub async fn status(&self) -> ServiceStatus {
        ServiceStatus {
            running: self.is_running(),
            dispatch: self.dispatch_stats.snapshot().await,
            reconcile: self.reconcile_stats.snapshot().await,
        }
    }

    /// Spawn the dispatch loop task.
    fn spawn_dispatch_loop(&self) -> JoinHandle<()> {
        let dispatcher = Arc::clone(&self.dispatcher);

        self.spawn_poll_loop(
            "Dispatch",
            self.intervals.dispatch,
            Arc::clone(&self.dispatch_stats),
            move || {
                let dispatcher = Arc::clone(&dispatcher);
                async move {
                    let report = dispatcher.run_pass().await.map_err(|e| e.to_string())?;
                    if !report.files.is_empty() {
                        info!(
                            "Dispatch pass finished: {} processed, {} failed",
                            report.processed_count(),
                            report.failed_count()
                        );
                    }
                    if report.relocation_failures() > 0 {
                        warn!(
                            "{} files could not be moved out of the inbound folder",
                            report.relocation_failures()
                        );
                    }
                    Ok::<(), String>(())
                }
            },
        )
    }

    /// Spawn the reconciliation loop task.
    fn spawn_reconcile_loop(&self) -> JoinHandle<()> {
        let reconciler = Arc::clone(&self.reconciler);

        self.spawn_poll_loop(
            "Reconciliation",
            self.intervals.reconcile,
            Arc::clone(&self.reconcile_stats),
            move || {
                let reconciler = Arc::clone(&reconciler);
                async move {
                    let report = reconciler.run_pass().await;
                    if !report.written.is_empty() {
                        info!(
                            "Reconciliation pass finished: {} responses saved, {} acknowledged",
                            report.written.len(),
                            report.acknowledged
                        );
                    }
                    match report.stop {
                        DrainStop::Failed(e) => Err(e.to_string()),
                        _ => Ok(()),
                    }
                }
            },
        )
    }

    /// Spawn a loop that runs `pass`, then waits `interval`, until shutdown.
    ///
    /// Errors and panics from a pass are logged and the loop carries on.
    fn spawn_poll_loop<F, Fut>(
        &self,
        name: &'static str,
        interval: Duration,
        stats: Arc<LoopStats>,
        pass: F,
    ) -> JoinHandle<()>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        let shutdown = Arc::clone(&self.shutdown);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("{} loop started", name);
            loop {
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }

                let faulted = match catch_panic(pass()).await {
                    Ok(Ok(())) => false,
                    Ok(Err(e)) => {
                        error!("{} pass failed: {}", name, e);
                        true
                    }
                    Err(panic) => {
                        error!("{} pass panicked: {}", name, panic);
                        true
                    }
                };
                stats.record_pass(faulted).await;

                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!("{} loop received shutdown signal", name);
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            info!("{} loop stopped", name);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FolderConfig;
    use crate::testing::MockPurchaseOrderClient;
    use tempfile::TempDir;

    async fn service(temp: &TempDir, client: Arc<MockPurchaseOrderClient>) -> ConnectorService {
        let mailbox = Mailbox::new(FolderConfig {
            inbound_orders: temp.path().join("inbound"),
            processed_orders: temp.path().join("processed"),
            failed_orders: temp.path().join("failed"),
            order_responses: temp.path().join("responses"),
        });
        mailbox.ensure_directories().await.unwrap();
        ConnectorService::new(
            Dispatcher::new(mailbox.clone(), client.clone()),
            Reconciler::new(mailbox, client),
            PollIntervals {
                dispatch: Duration::from_millis(20),
                reconcile: Duration::from_millis(20),
            },
        )
    }

    #[tokio::test]
    async fn test_start_stop() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp, Arc::new(MockPurchaseOrderClient::new())).await;

        assert!(!service.status().await.running);
        service.start().await;
        assert!(service.status().await.running);

        tokio::time::sleep(Duration::from_millis(50)).await;
        service.stop().await;

        let status = service.status().await;
        assert!(!status.running);
        assert!(status.dispatch.passes >= 1);
        assert!(status.reconcile.passes >= 1);
        assert!(service.handles.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_double_start_and_stop_are_ignored() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp, Arc::new(MockPurchaseOrderClient::new())).await;

        service.start().await;
        service.start().await;
        assert_eq!(service.handles.lock().await.len(), 2);

        service.stop().await;
        service.stop().await;
        assert!(!service.is_running());
    }

    #[tokio::test]
    async fn test_panicking_pass_does_not_end_loop() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(MockPurchaseOrderClient::new());
        client.panic_on_next_fetch().await;
        let service = service(&temp, client).await;

        service.start().await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        service.stop().await;

        let status = service.status().await;
        assert_eq!(status.reconcile.faults, 1);
        assert!(status.reconcile.passes >= 2);
    }
}
