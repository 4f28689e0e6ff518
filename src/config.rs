use std::{fmt, time::Duration};

use anyhow::{ensure, Context, Result};

// ---------------------------------------------------------------------------
// TankDbConfig
// ---------------------------------------------------------------------------

/// Connection parameters for the sensor-telemetry ("tank") database.
#[derive(Clone)]
pub struct TankDbConfig {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub name: String,
}

impl fmt::Debug for TankDbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TankDbConfig")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Config {
    pub tank_db: TankDbConfig,
    /// Connection URL of the notification store. TLS is always required.
    pub user_db_url: String,
    /// Time between two scheduled cycles.
    pub check_interval: Duration,
    /// Trailing window the reading query looks back over.
    pub lookback: Duration,
    /// Upper bound on establishing either database connection.
    pub connect_timeout: Duration,
    pub status_host: String,
    /// Status API port. `None` keeps the API disabled.
    pub status_port: Option<u16>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("tank_db", &self.tank_db)
            .field("user_db_url", &"<redacted>")
            .field("check_interval", &self.check_interval)
            .field("lookback", &self.lookback)
            .field("connect_timeout", &self.connect_timeout)
            .field("status_host", &self.status_host)
            .field("status_port", &self.status_port)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests never touch
    /// the process environment.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            lookup(key).with_context(|| format!("missing required env var: {key}"))
        };
        let optional =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        Ok(Self {
            tank_db: TankDbConfig {
                user: required("TANK_DB_USER")?,
                password: required("TANK_DB_PASSWORD")?,
                host: required("TANK_DB_HOST")?,
                port: optional("TANK_DB_PORT", "5432")
                    .parse()
                    .context("TANK_DB_PORT must be a valid port number")?,
                name: required("TANK_DB_NAME")?,
            },
            user_db_url: required("USER_DB_URL")?,
            check_interval: seconds(&optional("CHECK_INTERVAL_SECS", "3600"), "CHECK_INTERVAL_SECS")?,
            lookback: seconds(&optional("LOOKBACK_SECS", "60"), "LOOKBACK_SECS")?,
            connect_timeout: seconds(&optional("CONNECT_TIMEOUT_SECS", "10"), "CONNECT_TIMEOUT_SECS")?,
            status_host: optional("STATUS_HOST", "0.0.0.0"),
            status_port: lookup("STATUS_PORT")
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().parse())
                .transpose()
                .context("STATUS_PORT must be a valid port number")?,
        })
    }
}

/// Parse a strictly positive number of seconds.
fn seconds(raw: &str, key: &str) -> Result<Duration> {
    let secs: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a positive integer"))?;
    ensure!(secs > 0, "{key} must be a positive integer");
    Ok(Duration::from_secs(secs))
}
