pub mod error;
pub mod models;
pub mod notifications;
pub mod readings;

use std::{future::Future, time::Duration};

use sqlx::{
    postgres::{PgConnectOptions, PgConnection},
    ConnectOptions,
};
use tokio::time;

use crate::evaluator::AlertRecord;

pub use self::{
    error::StoreError, models::SensorReading, notifications::PgNotificationStore,
    readings::PgReadingStore,
};

/// Supplies the latest reading per `(device, sensor)` observed within a
/// trailing window.
pub trait ReadingSource {
    fn fetch_recent(
        &self,
        lookback: Duration,
    ) -> impl Future<Output = Result<Vec<SensorReading>, StoreError>> + Send;
}

/// Durable sink for alert records. A batch is stored all-or-nothing.
pub trait NotificationSink {
    /// Returns the number of records stored.
    fn insert_batch(
        &self,
        alerts: &[AlertRecord],
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;
}

/// Open a single connection, giving up after `timeout`.
pub(crate) async fn connect(
    store: &'static str,
    options: &PgConnectOptions,
    timeout: Duration,
) -> Result<PgConnection, StoreError> {
    match time::timeout(timeout, options.connect()).await {
        Ok(Ok(conn)) => Ok(conn),
        Ok(Err(source)) => Err(StoreError::Connect { store, source }),
        Err(_) => Err(StoreError::ConnectTimeout { store, timeout }),
    }
}
