use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Outcome of a single fetch → evaluate → persist cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub readings_fetched: usize,
    pub alerts_inserted: usize,
    pub within_range: usize,
    /// Readings whose sensor has no threshold entry.
    pub unmonitored: usize,
    /// Set when the cycle was aborted.
    pub error: Option<String>,
}

impl CycleReport {
    pub fn start(cycle_id: Uuid) -> Self {
        Self {
            cycle_id,
            started_at: Utc::now(),
            finished_at: None,
            readings_fetched: 0,
            alerts_inserted: 0,
            within_range: 0,
            unmonitored: 0,
            error: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSnapshot {
    pub last_cycle: Option<CycleReport>,
    pub cycles_completed: u64,
    pub cycles_failed: u64,
}

/// Most recent cycle outcome plus running totals, shared between the
/// monitor loop and the status API.
///
/// Wrapped in `Arc` so it can be cheaply cloned and shared across tasks.
#[derive(Clone, Default)]
pub struct CycleStatus {
    inner: Arc<RwLock<StatusSnapshot>>,
}

impl CycleStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the last report and bump the matching counter.
    pub async fn record(&self, report: CycleReport) {
        let mut guard = self.inner.write().await;
        if report.succeeded() {
            guard.cycles_completed += 1;
        } else {
            guard.cycles_failed += 1;
        }
        guard.last_cycle = Some(report);
    }

    pub async fn snapshot(&self) -> StatusSnapshot {
        self.inner.read().await.clone()
    }
}
