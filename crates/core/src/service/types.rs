//! Types for the connector service.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::PollingConfig;

/// Wait between the end of one pass and the start of the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIntervals {
    pub dispatch: Duration,
    pub reconcile: Duration,
}

impl From<&PollingConfig> for PollIntervals {
    fn from(config: &PollingConfig) -> Self {
        Self {
            dispatch: config.inbound_interval(),
            reconcile: config.response_interval(),
        }
    }
}

/// Counters for one poll loop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoopStatus {
    /// Passes completed, including failed ones.
    pub passes: u64,
    /// Passes that ended in an error or a panic.
    pub faults: u64,
    /// When the last pass finished.
    pub last_pass_at: Option<DateTime<Utc>>,
}

/// Current status of the connector service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStatus {
    /// Whether both loops have been started and not stopped.
    pub running: bool,
    pub dispatch: LoopStatus,
    pub reconcile: LoopStatus,
}

/// Shared counters a loop task updates after each pass.
#[derive(Debug, Default)]
pub(crate) struct LoopStats {
    passes: AtomicU64,
    faults: AtomicU64,
    last_pass_at: RwLock<Option<DateTime<Utc>>>,
}

impl LoopStats {
    pub(crate) async fn record_pass(&self, faulted: bool) {
        self.passes.fetch_add(1, Ordering::Relaxed);
        if faulted {
            self.faults.fetch_add(1, Ordering::Relaxed);
        }
        *self.last_pass_at.write().await = Some(Utc::now());
    }

    pub(crate) async fn snapshot(&self) -> LoopStatus {
        LoopStatus {
            passes: self.passes.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
            last_pass_at: *self.last_pass_at.read().await,
        }
    }
}
