use sqlx::FromRow;

/// Latest observation of one sensor on one device, as returned by the
/// reading query in [`crate::db::readings`].
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct SensorReading {
    pub device_name: String,
    pub location_id: i32,
    pub location_name: String,
    pub sensor_id: i32,
    /// Display name, e.g. `"Soil pH"`.
    pub sensor_name: String,
    pub value: f64,
    /// `DD/MM/YYYY HH24:MI`, formatted by the database.
    pub formatted_timestamp: String,
}
