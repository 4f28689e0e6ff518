use std::{str::FromStr, time::Duration};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use sqlx::{
    postgres::{PgConnectOptions, PgSslMode},
    Connection,
};
use tracing::{debug, warn};

use super::{connect, NotificationSink, StoreError};
use crate::{config::Config, evaluator::AlertRecord};

const STORE: &str = "user DB";

/// Format the reading query renders observation times in.
pub const READING_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

const INSERT_NOTIFICATION_SQL: &str = r#"
    INSERT INTO notifications (timestamp, type, category, header, message, location_id)
    VALUES ($1, $2, $3, $4, $5, $6)
"#;

/// Writes alert records to the `notifications` table of the user database.
///
/// Every batch gets its own TLS connection and a single transaction.
#[derive(Debug, Clone)]
pub struct PgNotificationStore {
    options: PgConnectOptions,
    connect_timeout: Duration,
}

impl PgNotificationStore {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            options: connect_options(&config.user_db_url)?,
            connect_timeout: config.connect_timeout,
        })
    }
}

/// Parse the URL and force encrypted transport regardless of any `sslmode`
/// it carries.
fn connect_options(url: &str) -> Result<PgConnectOptions> {
    let options = PgConnectOptions::from_str(url).context("USER_DB_URL is not a valid Postgres URL")?;
    Ok(options.ssl_mode(PgSslMode::Require))
}

/// Parse `DD/MM/YYYY HH24:MI` (day first) into a timestamp.
pub fn parse_reading_timestamp(raw: &str) -> Result<NaiveDateTime, StoreError> {
    NaiveDateTime::parse_from_str(raw.trim(), READING_TIMESTAMP_FORMAT).map_err(|e| {
        StoreError::DataShape {
            store: STORE,
            detail: format!("bad reading timestamp {raw:?}: {e}"),
        }
    })
}

impl NotificationSink for PgNotificationStore {
    async fn insert_batch(&self, alerts: &[AlertRecord]) -> Result<usize, StoreError> {
        // Reject the whole batch before touching the database.
        let timestamps = alerts
            .iter()
            .map(|a| parse_reading_timestamp(&a.timestamp))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(host = %self.options.get_host(), "Connecting to user DB");
        let mut conn = connect(STORE, &self.options, self.connect_timeout).await?;

        let result = async {
            let mut tx = conn.begin().await?;
            for (alert, ts) in alerts.iter().zip(timestamps) {
                sqlx::query(INSERT_NOTIFICATION_SQL)
                    .bind(ts)
                    .bind(alert.kind)
                    .bind(&alert.category)
                    .bind(&alert.header)
                    .bind(&alert.message)
                    .bind(alert.location_id)
                    .execute(&mut *tx)
                    .await?;
                debug!(device = %alert.category, header = %alert.header, "Notification staged");
            }
            tx.commit().await
        }
        .await
        .map_err(|e| StoreError::from_query(STORE, e));

        if let Err(e) = conn.close().await {
            warn!(error = %e, "Failed to close user DB connection cleanly");
        }

        result?;
        Ok(alerts.len())
    }
}
