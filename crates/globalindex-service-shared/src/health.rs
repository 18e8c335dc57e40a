//! Health check handlers for Kubernetes.
//!
//! Provides `/health/live` and `/health/ready` endpoints that return JSON
//! status responses for Kubernetes liveness and readiness checks.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use globalindex_lib::{RefreshState, RunSummary, StoreBackend};
use serde::{Deserialize, Serialize};

use crate::{AppState, ServiceInfo};

/// Health status response for liveness and readiness checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Status indicator: "ok" or "not_ready: <reason>".
    pub status: String,

    /// Service name for identification.
    pub service: String,

    /// Service version from build-time.
    pub version: String,

    /// RFC 3339 time the status was produced.
    pub timestamp: String,

    /// Store backend in use (for readiness check).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<StoreBackend>,

    /// Whether a refresh run is in flight (for readiness check).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh: Option<RefreshState>,

    /// Outcome of the most recent refresh run, if any has completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_refresh: Option<RunSummary>,
}

impl HealthStatus {
    /// Create a healthy liveness status.
    pub fn alive(service: &str, version: &str) -> Self {
        Self {
            status: "ok".to_string(),
            service: service.to_string(),
            version: version.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            backend: None,
            refresh: None,
            last_refresh: None,
        }
    }

    /// Create a ready status with store and refresh information.
    pub fn ready(
        service: &str,
        version: &str,
        backend: StoreBackend,
        refresh: RefreshState,
        last_refresh: Option<RunSummary>,
    ) -> Self {
        Self {
            backend: Some(backend),
            refresh: Some(refresh),
            last_refresh,
            ..Self::alive(service, version)
        }
    }

    /// Create a not-ready status.
    pub fn not_ready(service: &str, version: &str, reason: &str) -> Self {
        Self {
            status: format!("not_ready: {}", reason),
            ..Self::alive(service, version)
        }
    }
}

/// Liveness check handler.
///
/// Returns 200 OK if the service is running. This is a simple check that does
/// not depend on external resources.
///
/// # Example
///
/// ```text
/// GET /health/live
/// {"status":"ok","service":"globalindex-service-records","version":"0.1.0","timestamp":"..."}
/// ```
pub async fn health_live(State(state): State<AppState>) -> impl IntoResponse {
    let service = state.service();
    let status = HealthStatus::alive(service.name, service.version);
    (StatusCode::OK, Json(status))
}

/// Readiness check handler.
///
/// Returns 200 OK when the record store answers a ping. A refresh run in
/// progress does not make the service unready; reads keep being served.
///
/// # Example
///
/// ```text
/// GET /health/ready
/// {"status":"ok",...,"backend":"sqlite","refresh":"idle"}
/// ```
pub async fn health_ready(State(state): State<AppState>) -> Response {
    let ServiceInfo {
        name: service,
        version,
    } = state.service();

    if let Err(err) = state.store().ping().await {
        tracing::warn!(backend = %state.backend(), error = %err, "store ping failed");
        let status = HealthStatus::not_ready(service, version, "record store unavailable");
        return (StatusCode::SERVICE_UNAVAILABLE, Json(status)).into_response();
    }

    let status = HealthStatus::ready(
        service,
        version,
        state.backend(),
        state.refresh().state(),
        state.refresh().last_run(),
    );
    (StatusCode::OK, Json(status)).into_response()
}
