//! Prometheus metrics infrastructure for the records service.
//!
//! This module provides:
//! - [`MetricsConfig`]: Configuration for the metrics system
//! - [`init_metrics`]: Initialize the Prometheus metrics recorder
//! - [`metrics_handler`]: Axum handler for `/metrics` endpoint
//! - Business metric helpers for record queries and refresh runs
//!
//! # Example
//!
//! ```no_run
//! use globalindex_service_shared::metrics::{MetricsConfig, init_metrics, metrics_handler};
//! use axum::{Router, routing::get};
//!
//! // Initialize metrics at startup
//! let config = MetricsConfig::default();
//! init_metrics(&config).expect("failed to initialize metrics");
//!
//! // Add metrics endpoint to router
//! let app: Router = Router::new()
//!     .route("/metrics", get(metrics_handler));
//! ```

use globalindex_lib::{QueryOutcome, RefreshObserver, RefreshTrigger, RunResult, StoreBackend};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Configuration for the metrics system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Whether metrics collection is enabled.
    pub enabled: bool,
    /// Path for the metrics endpoint (e.g., "/metrics").
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

impl MetricsConfig {
    /// Create configuration from environment variables.
    ///
    /// - `METRICS_ENABLED`: "true" or "false" (default: true)
    /// - `METRICS_PATH`: Path for metrics endpoint (default: "/metrics")
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let enabled = lookup("METRICS_ENABLED")
            .map(|v| !matches!(v.trim().to_lowercase().as_str(), "false" | "0" | "no" | "off"))
            .unwrap_or(true);

        let path = lookup("METRICS_PATH")
            .filter(|p| p.starts_with('/'))
            .unwrap_or_else(|| "/metrics".to_string());

        Self { enabled, path }
    }
}

/// Initialize the Prometheus metrics recorder.
///
/// This must be called once at application startup before any metrics are recorded.
/// Subsequent calls will return an error.
///
/// # Errors
///
/// Returns an error if:
/// - Metrics are disabled in configuration
/// - The recorder has already been installed
/// - The Prometheus builder fails to install
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Err(MetricsError::Disabled);
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| MetricsError::InstallFailed(e.to_string()))?;

    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| MetricsError::AlreadyInitialized)?;

    Ok(())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if [`init_metrics`] has not been called.
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Axum handler for the `/metrics` endpoint.
///
/// Returns Prometheus exposition format text.
pub async fn metrics_handler() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|h| h.render())
        .unwrap_or_else(|| "# Metrics not initialized\n".to_string())
}

/// Errors that can occur during metrics initialization.
#[derive(Debug, Clone)]
pub enum MetricsError {
    /// Metrics are disabled in configuration.
    Disabled,
    /// The recorder has already been installed.
    AlreadyInitialized,
    /// The Prometheus builder failed to install.
    InstallFailed(String),
}

impl std::fmt::Display for MetricsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricsError::Disabled => write!(f, "metrics are disabled"),
            MetricsError::AlreadyInitialized => write!(f, "metrics recorder already initialized"),
            MetricsError::InstallFailed(e) => {
                write!(f, "failed to install metrics recorder: {}", e)
            }
        }
    }
}

impl std::error::Error for MetricsError {}

// =============================================================================
// Business Metrics Helpers
// =============================================================================

/// Record records returned with 200.
///
/// Increments `globalindex_records_served_total` by the number of records.
///
/// # Arguments
///
/// * `operation` - The query label (e.g., "records_by_country")
/// * `count` - Number of records in the response
pub fn record_records_served(operation: &'static str, count: usize) {
    metrics::counter!(
        "globalindex_records_served_total",
        "operation" => operation
    )
    .increment(count as u64);
}

/// Record a filtered query that matched nothing.
///
/// Increments `globalindex_records_not_found_total`.
pub fn record_records_not_found(operation: &'static str) {
    metrics::counter!(
        "globalindex_records_not_found_total",
        "operation" => operation
    )
    .increment(1);
}

/// Record a store failure surfaced as a 500.
///
/// Increments `globalindex_store_errors_total`.
pub fn record_store_error(operation: &'static str, backend: StoreBackend) {
    metrics::counter!(
        "globalindex_store_errors_total",
        "operation" => operation,
        "backend" => backend.as_str()
    )
    .increment(1);
}

/// Record the outcome of one resolved query.
pub fn record_query_outcome(operation: &'static str, backend: StoreBackend, outcome: &QueryOutcome) {
    match outcome {
        QueryOutcome::Found(records) => record_records_served(operation, records.len()),
        QueryOutcome::NotFound { .. } => record_records_not_found(operation),
        QueryOutcome::Failed { .. } => record_store_error(operation, backend),
    }
}

/// Record a finished refresh run.
///
/// Increments `globalindex_refresh_runs_total` and records the run duration
/// to `globalindex_refresh_duration_seconds`.
pub fn record_refresh_run(result: &RunResult) {
    metrics::counter!(
        "globalindex_refresh_runs_total",
        "outcome" => result.outcome.label(),
        "trigger" => result.trigger.to_string()
    )
    .increment(1);

    let elapsed = (result.finished_at - result.started_at)
        .to_std()
        .unwrap_or_default();
    metrics::histogram!(
        "globalindex_refresh_duration_seconds",
        "outcome" => result.outcome.label()
    )
    .record(elapsed.as_secs_f64());
}

/// Record a trigger that was skipped because a run was in flight.
///
/// Increments `globalindex_refresh_skipped_total`.
pub fn record_refresh_skipped(trigger: RefreshTrigger) {
    metrics::counter!(
        "globalindex_refresh_skipped_total",
        "trigger" => trigger.to_string()
    )
    .increment(1);
}

/// Feeds refresh runner events into the metrics above.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsRefreshObserver;

impl RefreshObserver for MetricsRefreshObserver {
    fn run_finished(&self, result: &RunResult) {
        record_refresh_run(result);
    }

    fn trigger_skipped(&self, trigger: RefreshTrigger) {
        record_refresh_skipped(trigger);
    }
}
