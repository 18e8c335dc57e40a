//! Shared HTTP infrastructure for the Global Index records service.
//!
//! This crate provides the HTTP glue around `globalindex-lib`:
//!
//! - [`AppState`]: The connected record store and the refresh runner
//! - [`health_live`] / [`health_ready`]: Health check handlers for Kubernetes liveness/readiness checks
//! - [`RecordsResponse`]: Maps a resolved query to 200 / 404 / 500
//! - [`metrics`]: Prometheus metrics infrastructure
//! - [`logging`]: Structured JSON logging setup
//! - [`middleware`]: Request tracking and metrics middleware
//! - [`docs`]: OpenAPI document and Swagger UI
//!
//! # Architecture
//!
//! Handlers stay thin; all query and refresh behavior lives in
//! `globalindex-lib`:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  axum Handler                                               │
//! │  - Extract path parameters                                  │
//! │  - Build a RecordQuery                                      │
//! │  - globalindex_lib::resolve                                 │
//! │  - RecordsResponse::from(outcome)                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Testing Support
//!
//! The [`test_utils`] module provides in-memory stores and mock state for
//! handler testing. Enable the `test-utils` feature to access it from
//! dependent crates.

#![deny(warnings)]

pub mod docs;
mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;
mod response;
mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use docs::{openapi_document, openapi_handler, swagger_ui_handler};
pub use health::{health_live, health_ready, HealthStatus};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::{
    init_metrics, metrics_handler, record_query_outcome, record_refresh_run,
    record_refresh_skipped, MetricsConfig, MetricsError, MetricsRefreshObserver,
};
pub use middleware::{
    cors_layer, extract_or_generate_request_id, trace_layer, MetricsLayer, RequestId,
};
pub use response::{ErrorBody, NotFoundBody, RecordsResponse};
pub use state::{AppState, ServiceInfo};
