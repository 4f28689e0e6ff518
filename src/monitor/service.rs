use std::time::Duration;

use anyhow::{ensure, Context, Result};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::{
    cycle_status::{CycleReport, CycleStatus},
    db::{NotificationSink, ReadingSource, SensorReading},
    evaluator::{evaluate, AlertRecord},
    thresholds::ThresholdRegistry,
};

/// Fetches recent readings, evaluates them against the threshold registry,
/// and stores an alert for every out-of-range value.
pub struct Monitor<R, N> {
    readings: R,
    notifier: N,
    registry: ThresholdRegistry,
    status: CycleStatus,
    interval: Duration,
    lookback: Duration,
}

impl<R: ReadingSource, N: NotificationSink> Monitor<R, N> {
    pub fn new(
        readings: R,
        notifier: N,
        registry: ThresholdRegistry,
        status: CycleStatus,
        interval: Duration,
        lookback: Duration,
    ) -> Self {
        Self {
            readings,
            notifier,
            registry,
            status,
            interval,
            lookback,
        }
    }

    /// Runs one cycle straight away, then one per interval, forever.
    ///
    /// Each cycle is awaited before the next tick is taken, so cycles never
    /// overlap. A slow cycle delays the following ticks instead of bursting.
    pub async fn run(self) {
        info!(
            interval_secs = self.interval.as_secs(),
            lookback_secs = self.lookback.as_secs(),
            monitored_sensors = self.registry.len(),
            "Monitor started"
        );

        self.run_once().await;

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.run_once().await;
        }
    }

    /// Runs a single cycle inside its failure boundary.
    ///
    /// Errors are logged and recorded in the shared status, never returned.
    pub async fn run_once(&self) -> CycleReport {
        let cycle_id = Uuid::new_v4();

        async {
            info!("Running threshold check");
            let mut report = CycleReport::start(cycle_id);

            match self.run_cycle(&mut report).await {
                Ok(()) => info!(
                    readings = report.readings_fetched,
                    alerts = report.alerts_inserted,
                    within_range = report.within_range,
                    unmonitored = report.unmonitored,
                    "Threshold check done"
                ),
                Err(e) => {
                    let msg = format!("{e:#}");
                    error!(error = %msg, "Threshold check failed");
                    report.error = Some(msg);
                }
            }

            report.finished_at = Some(chrono::Utc::now());
            self.status.record(report.clone()).await;
            report
        }
        .instrument(info_span!("cycle", %cycle_id))
        .await
    }

    async fn run_cycle(&self, report: &mut CycleReport) -> Result<()> {
        let readings = self
            .readings
            .fetch_recent(self.lookback)
            .await
            .context("fetching latest sensor readings")?;
        report.readings_fetched = readings.len();

        let staged = self.stage_alerts(&readings, report)?;
        if staged.is_empty() {
            debug!("No out-of-range readings; nothing to insert");
            return Ok(());
        }

        report.alerts_inserted = self
            .notifier
            .insert_batch(&staged)
            .await
            .context("inserting notifications")?;

        for alert in &staged {
            info!(device = %alert.category, header = %alert.header, "Notification inserted");
        }
        Ok(())
    }

    /// Evaluate every reading and collect the alerts to persist.
    ///
    /// A NaN or infinite value aborts the cycle: it is neither inside nor
    /// outside any range.
    fn stage_alerts(
        &self,
        readings: &[SensorReading],
        report: &mut CycleReport,
    ) -> Result<Vec<AlertRecord>> {
        let mut staged = Vec::new();

        for reading in readings {
            ensure!(
                reading.value.is_finite(),
                "non-finite value {} for {} on {}",
                reading.value,
                reading.sensor_name,
                reading.device_name
            );

            let Some(range) = self.registry.lookup(reading.sensor_id) else {
                debug!(
                    sensor_id = reading.sensor_id,
                    sensor = %reading.sensor_name,
                    "Sensor not monitored; skipping"
                );
                report.unmonitored += 1;
                continue;
            };

            match evaluate(&reading.sensor_name, &reading.device_name, reading.value, range) {
                Some(alert) => {
                    debug!(
                        device = %reading.device_name,
                        sensor = %reading.sensor_name,
                        value = reading.value,
                        breach = ?alert.breach,
                        "Reading out of range; alert staged"
                    );
                    staged.push(AlertRecord::new(alert, reading));
                }
                None => {
                    debug!(
                        device = %reading.device_name,
                        location = %reading.location_name,
                        sensor = %reading.sensor_name,
                        value = reading.value,
                        "Reading within range"
                    );
                    report.within_range += 1;
                }
            }
        }

        Ok(staged)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    };

    use super::*;
    use crate::{db::StoreError, thresholds::ThresholdRange};

    #[derive(Clone, Default)]
    struct FakeReadings {
        rows: Vec<SensorReading>,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl ReadingSource for FakeReadings {
        async fn fetch_recent(&self, _lookback: Duration) -> Result<Vec<SensorReading>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StoreError::ConnectTimeout {
                    store: "tank DB",
                    timeout: Duration::from_secs(10),
                });
            }
            Ok(self.rows.clone())
        }
    }

    #[derive(Clone, Default)]
    struct FakeSink {
        stored: Arc<Mutex<Vec<AlertRecord>>>,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl NotificationSink for FakeSink {
        async fn insert_batch(&self, alerts: &[AlertRecord]) -> Result<usize, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StoreError::Query {
                    store: "user DB",
                    source: sqlx::Error::Protocol("connection reset".into()),
                });
            }
            self.stored.lock().unwrap().extend_from_slice(alerts);
            Ok(alerts.len())
        }
    }

    fn reading(sensor_id: i32, sensor: &str, device: &str, value: f64) -> SensorReading {
        SensorReading {
            device_name: device.to_owned(),
            location_id: 7,
            location_name: "North shed".to_owned(),
            sensor_id,
            sensor_name: sensor.to_owned(),
            value,
            formatted_timestamp: "01/01/2024 10:00".to_owned(),
        }
    }

    fn monitor(readings: FakeReadings, sink: FakeSink) -> Monitor<FakeReadings, FakeSink> {
        let registry = ThresholdRegistry::from_entries([
            (1, ThresholdRange::new(2121.0, 3303.0)),
            (10, ThresholdRange::new(4.7, 6.0)),
        ]);
        Monitor::new(
            readings,
            sink,
            registry,
            CycleStatus::new(),
            Duration::from_secs(3600),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn high_co2_produces_one_notification() {
        let sink = FakeSink::default();
        let readings = FakeReadings {
            rows: vec![reading(1, "CO2", "TankA", 3500.0)],
            ..Default::default()
        };
        let report = monitor(readings, sink.clone()).run_once().await;

        assert!(report.succeeded());
        assert_eq!(report.alerts_inserted, 1);

        let stored = sink.stored.lock().unwrap();
        assert_eq!(
            stored.as_slice(),
            &[AlertRecord {
                timestamp: "01/01/2024 10:00".to_owned(),
                kind: "Compost",
                category: "TankA".to_owned(),
                header: "CO2 is too high!".to_owned(),
                message: "Current CO2 level is 3500, above recommended maximum 3303.".to_owned(),
                location_id: 7,
            }]
        );
    }

    #[tokio::test]
    async fn in_range_reading_skips_notification_store() {
        let sink = FakeSink::default();
        let readings = FakeReadings {
            rows: vec![reading(10, "Soil pH", "TankA", 5.0)],
            ..Default::default()
        };
        let report = monitor(readings, sink.clone()).run_once().await;

        assert!(report.succeeded());
        assert_eq!(report.within_range, 1);
        assert_eq!(report.alerts_inserted, 0);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unmonitored_sensor_never_alerts() {
        let sink = FakeSink::default();
        let readings = FakeReadings {
            rows: vec![reading(2, "Air Humidity", "TankA", 1.0e9)],
            ..Default::default()
        };
        let report = monitor(readings, sink.clone()).run_once().await;

        assert_eq!(report.unmonitored, 1);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
        assert!(sink.stored.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn mixed_batch_is_inserted_in_one_call() {
        let sink = FakeSink::default();
        let readings = FakeReadings {
            rows: vec![
                reading(1, "CO2", "TankA", 3500.0),
                reading(1, "CO2", "TankB", 2500.0),
                reading(10, "Soil pH", "TankB", 4.1),
                reading(13, "Soil Phosphorus", "TankB", 0.0),
            ],
            ..Default::default()
        };
        let report = monitor(readings, sink.clone()).run_once().await;

        assert_eq!(report.readings_fetched, 4);
        assert_eq!(report.alerts_inserted, 2);
        assert_eq!(report.within_range, 1);
        assert_eq!(report.unmonitored, 1);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);

        let headers: Vec<String> = sink
            .stored
            .lock()
            .unwrap()
            .iter()
            .map(|a| format!("{}: {}", a.category, a.header))
            .collect();
        assert_eq!(headers, vec!["TankA: CO2 is too high!", "TankB: Soil pH is too low!"]);
    }

    #[tokio::test]
    async fn sustained_breach_alerts_every_cycle() {
        let sink = FakeSink::default();
        let readings = FakeReadings {
            rows: vec![reading(1, "CO2", "TankA", 4000.0)],
            ..Default::default()
        };
        let monitor = monitor(readings, sink.clone());
        monitor.run_once().await;
        monitor.run_once().await;

        assert_eq!(sink.stored.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn fetch_failure_is_contained() {
        let sink = FakeSink::default();
        let readings = FakeReadings {
            fail: true,
            ..Default::default()
        };
        let monitor = monitor(readings, sink.clone());
        let report = monitor.run_once().await;

        let err = report.error.as_deref().unwrap();
        assert!(err.contains("fetching latest sensor readings"));
        assert!(err.contains("timed out"));
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);

        let snap = monitor.status.snapshot().await;
        assert_eq!(snap.cycles_failed, 1);
        assert_eq!(snap.cycles_completed, 0);
    }

    #[tokio::test]
    async fn insert_failure_is_not_retried() {
        let sink = FakeSink {
            fail: true,
            ..Default::default()
        };
        let readings = FakeReadings {
            rows: vec![reading(1, "CO2", "TankA", 3500.0)],
            ..Default::default()
        };
        let monitor = monitor(readings, sink.clone());
        let report = monitor.run_once().await;

        assert!(!report.succeeded());
        assert_eq!(report.alerts_inserted, 0);
        assert!(report.error.unwrap().contains("inserting notifications"));
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_finite_value_aborts_cycle() {
        let sink = FakeSink::default();
        let readings = FakeReadings {
            rows: vec![
                reading(1, "CO2", "TankA", 3500.0),
                reading(10, "Soil pH", "TankA", f64::NAN),
            ],
            ..Default::default()
        };
        let report = monitor(readings, sink.clone()).run_once().await;

        assert!(report.error.unwrap().contains("non-finite value NaN for Soil pH on TankA"));
        assert_eq!(report.within_range, 0);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn run_fires_eagerly_then_hourly_despite_failures() {
        let readings = FakeReadings {
            rows: vec![reading(1, "CO2", "TankA", 3500.0)],
            ..Default::default()
        };
        let sink = FakeSink {
            fail: true,
            ..Default::default()
        };
        let fetches = readings.calls.clone();
        let inserts = sink.calls.clone();
        let status = CycleStatus::new();

        let mut monitor = monitor(readings, sink);
        monitor.status = status.clone();
        let handle = tokio::spawn(monitor.run());

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fetches.load(Ordering::SeqCst), 1);

        time::sleep(Duration::from_secs(3 * 3600)).await;
        assert_eq!(fetches.load(Ordering::SeqCst), 4);
        assert_eq!(inserts.load(Ordering::SeqCst), 4);
        assert_eq!(status.snapshot().await.cycles_failed, 4);
        assert!(!handle.is_finished());

        handle.abort();
    }
}
