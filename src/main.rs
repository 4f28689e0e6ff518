mod api;
mod config;
mod cycle_status;
mod db;
mod evaluator;
mod monitor;
mod thresholds;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{
    api::AppState,
    config::Config,
    cycle_status::CycleStatus,
    db::{PgNotificationStore, PgReadingStore},
    monitor::Monitor,
    thresholds::ThresholdRegistry,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env (ignore error if file absent; env vars may be set externally)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    info!(config = ?config, "Configuration loaded");

    let registry = ThresholdRegistry::compost();
    let status = CycleStatus::new();

    let monitor = Monitor::new(
        PgReadingStore::new(&config),
        PgNotificationStore::new(&config)?,
        registry.clone(),
        status.clone(),
        config.check_interval,
        config.lookback,
    );

    if let Some(port) = config.status_port {
        let addr = format!("{}:{}", config.status_host, port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind status API on {addr}"))?;
        info!(addr = %addr, "Status API listening");

        let app = api::router(AppState { status, registry });
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!(error = %e, "Status API stopped");
            }
        });
    }

    tokio::select! {
        _ = monitor.run() => {},
        _ = shutdown_signal() => {},
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received; exiting");
}
