use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::cycle_status::{CycleReport, StatusSnapshot};

#[derive(Debug, Serialize, ToSchema)]
pub struct CycleReportDto {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub readings_fetched: usize,
    pub alerts_inserted: usize,
    pub within_range: usize,
    /// Readings from sensors without a threshold entry.
    pub unmonitored: usize,
    /// Present only when the cycle was aborted.
    pub error: Option<String>,
}

impl From<CycleReport> for CycleReportDto {
    fn from(r: CycleReport) -> Self {
        Self {
            cycle_id: r.cycle_id,
            started_at: r.started_at,
            finished_at: r.finished_at,
            readings_fetched: r.readings_fetched,
            alerts_inserted: r.alerts_inserted,
            within_range: r.within_range,
            unmonitored: r.unmonitored,
            error: r.error,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusDto {
    /// `null` until the first cycle has finished.
    pub last_cycle: Option<CycleReportDto>,
    pub cycles_completed: u64,
    pub cycles_failed: u64,
}

impl From<StatusSnapshot> for StatusDto {
    fn from(s: StatusSnapshot) -> Self {
        Self {
            last_cycle: s.last_cycle.map(Into::into),
            cycles_completed: s.cycles_completed,
            cycles_failed: s.cycles_failed,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ThresholdDto {
    pub sensor_id: i32,
    /// Inclusive lower bound.
    pub low: f64,
    /// Inclusive upper bound.
    pub high: f64,
}
