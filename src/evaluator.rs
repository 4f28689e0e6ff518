//! Turns a single sensor value into an alert when it leaves its range.

use crate::{db::models::SensorReading, thresholds::ThresholdRange};

/// Category label stamped on every alert this service emits.
pub const ALERT_TYPE: &str = "Compost";

/// Which side of the range a value fell out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Breach {
    Low,
    High,
}

/// Human-readable content of an alert, before it is tied to a reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub kind: &'static str,
    /// Device the alert concerns.
    pub category: String,
    pub header: String,
    pub message: String,
    pub breach: Breach,
}

/// A row destined for the `notifications` table.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRecord {
    /// Observation time, `DD/MM/YYYY HH24:MI`, copied from the reading.
    pub timestamp: String,
    pub kind: &'static str,
    pub category: String,
    pub header: String,
    pub message: String,
    pub location_id: i32,
}

impl AlertRecord {
    pub fn new(alert: Alert, reading: &SensorReading) -> Self {
        Self {
            timestamp: reading.formatted_timestamp.clone(),
            kind: alert.kind,
            category: alert.category,
            header: alert.header,
            message: alert.message,
            location_id: reading.location_id,
        }
    }
}

/// Compare `value` against the inclusive `range`.
///
/// Returns `None` when `range.low <= value <= range.high`.
pub fn evaluate(
    sensor_name: &str,
    device_name: &str,
    value: f64,
    range: ThresholdRange,
) -> Option<Alert> {
    let (breach, header, message) = if value < range.low {
        (
            Breach::Low,
            format!("{sensor_name} is too low!"),
            format!(
                "Current {sensor_name} level is {value}, below recommended minimum {}.",
                range.low
            ),
        )
    } else if value > range.high {
        (
            Breach::High,
            format!("{sensor_name} is too high!"),
            format!(
                "Current {sensor_name} level is {value}, above recommended maximum {}.",
                range.high
            ),
        )
    } else {
        return None;
    };

    Some(Alert {
        kind: ALERT_TYPE,
        category: device_name.to_owned(),
        header,
        message,
        breach,
    })
}
