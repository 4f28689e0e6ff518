use std::time::Duration;

use sqlx::{postgres::PgConnectOptions, Connection};
use tracing::{debug, info, warn};

use super::{connect, models::SensorReading, ReadingSource, StoreError};
use crate::config::{Config, TankDbConfig};

const STORE: &str = "tank DB";

/// Latest value per `(device, sensor)` inside the trailing window.
/// `$1` is the window length in seconds.
const LATEST_READINGS_SQL: &str = r#"
    SELECT DISTINCT ON (dev.devicename, sen.sensorid)
        dev.devicename                                    AS device_name,
        loc.locationid::int4                              AS location_id,
        loc.locationname                                  AS location_name,
        sen.sensorid::int4                                AS sensor_id,
        sen.sensor                                        AS sensor_name,
        sdata.value::float8                               AS value,
        TO_CHAR(ddata.dbtimestamp, 'DD/MM/YYYY HH24:MI')  AS formatted_timestamp
    FROM sensordata sdata
    JOIN devicedata ddata  ON sdata.devicedataid = ddata.devicedataid
    JOIN devices dev       ON ddata.deviceid = dev.deviceid
    JOIN locations loc     ON dev.locationid = loc.locationid
    JOIN devicesensors ds  ON ds.sensorid = sdata.sensorid AND ds.deviceid = dev.deviceid
    JOIN sensors sen       ON sen.sensorid = sdata.sensorid
    WHERE ddata.dbtimestamp >= NOW() - make_interval(secs => $1)
    ORDER BY dev.devicename, sen.sensorid, ddata.dbtimestamp DESC
"#;

/// Reads sensor telemetry from the tank database.
///
/// Every call opens its own connection and closes it before returning.
#[derive(Debug, Clone)]
pub struct PgReadingStore {
    options: PgConnectOptions,
    connect_timeout: Duration,
}

impl PgReadingStore {
    pub fn new(config: &Config) -> Self {
        Self {
            options: connect_options(&config.tank_db),
            connect_timeout: config.connect_timeout,
        }
    }
}

fn connect_options(db: &TankDbConfig) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&db.host)
        .port(db.port)
        .username(&db.user)
        .password(&db.password)
        .database(&db.name)
}

impl ReadingSource for PgReadingStore {
    async fn fetch_recent(&self, lookback: Duration) -> Result<Vec<SensorReading>, StoreError> {
        debug!(host = ?self.options.get_host(), "Connecting to tank DB");
        let mut conn = connect(STORE, &self.options, self.connect_timeout).await?;

        let rows = sqlx::query_as::<_, SensorReading>(LATEST_READINGS_SQL)
            .bind(lookback.as_secs_f64())
            .fetch_all(&mut conn)
            .await
            .map_err(|e| StoreError::from_query(STORE, e));

        if let Err(e) = conn.close().await {
            warn!(error = %e, "Failed to close tank DB connection cleanly");
        }

        let rows = rows?;
        info!(rows = rows.len(), lookback_secs = lookback.as_secs(), "Fetched latest sensor readings");
        Ok(rows)
    }
}
