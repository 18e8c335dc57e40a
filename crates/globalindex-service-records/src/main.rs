//! Global Index records HTTP service binary.
//!
//! # Configuration
//!
//! Read from the environment (and a `.env` file when present):
//!
//! - `API_PORT` - HTTP port (default: 5000)
//! - `STORE_BACKEND` - `sqlite` (default), `postgres` or `mongodb`
//! - `SQLITE_PATH`, `RECORDS_TABLE`, `DATABASE_URL` / `DB_*`, `MONGODB_URL`, `MONGODB_DATABASE`
//! - `QUERY_TIMEOUT_SECS` - per-request store timeout (default: none)
//! - `REFRESH_COMMAND`, `REFRESH_ARGS`, `REFRESH_WORKDIR` - the population routine
//! - `REFRESH_SCHEDULE` - cron expression (default: `0 0 1 1 *`)
//! - `REFRESH_ON_STARTUP` - run the routine once at startup (default: true)
//! - `REFRESH_TIMEOUT_SECS` - kill the routine after this long (default: none)
//! - `RUST_LOG` - Log level (default: info)
//! - `LOG_FORMAT` - Log format: json (default) or text
//! - `METRICS_ENABLED` - Prometheus endpoint (default: true)

use std::net::SocketAddr;

use tokio::sync::watch;
use tracing::{error, info, warn};

use globalindex_lib::{ServiceConfig, spawn_refresh_scheduler};
use globalindex_service_records::build_router_with_metrics;
use globalindex_service_shared::{
    AppState, LoggingConfig, MetricsConfig, init_logging, init_metrics, service_info,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv = dotenvy::dotenv();

    // Initialize logging (reads LOG_FORMAT from environment)
    let logging_config = LoggingConfig::from_env().with_service("records");
    init_logging(&logging_config);

    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded environment file"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "failed to read .env file"),
    }

    let metrics_config = MetricsConfig::from_env();
    if metrics_config.enabled {
        if let Err(e) = init_metrics(&metrics_config) {
            // Log but don't fail - metrics are optional
            warn!(error = %e, "failed to initialize metrics, continuing without metrics");
        }
    }

    let config = ServiceConfig::from_env().map_err(|e| {
        error!(error = %e, "invalid configuration");
        e
    })?;
    info!(
        port = config.port,
        backend = %config.store.backend(),
        schedule = config.refresh.schedule.expression(),
        "starting records service"
    );

    // The store is connected once; failure ends the process before binding.
    let state = AppState::connect(&config, service_info!()).await.map_err(|e| {
        error!(error = %e, backend = %config.store.backend(), "failed to connect to record store");
        e
    })?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = spawn_refresh_scheduler(
        state.refresh_arc(),
        config.refresh.schedule.clone(),
        config.refresh.run_on_startup,
        shutdown_rx,
    );

    let metrics_path = metrics_config
        .enabled
        .then_some(metrics_config.path.as_str());
    let app = build_router_with_metrics(state, metrics_path);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "server has started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped, stopping refresh scheduler");
    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler.await {
        warn!(error = %e, "refresh scheduler task ended abnormally");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
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
    info!("shutdown signal received");
}
