//! Global Index records HTTP service.
//!
//! Read-only access to the records dataset. Every records route maps to one
//! [`RecordQuery`]; the resolved outcome becomes the response.
//!
//! # Endpoints
//!
//! - `GET /` - Welcome message listing the routes
//! - `GET /records` - Every record (`200 []` when the dataset is empty)
//! - `GET /records/{country_id}` - Records for one country
//! - `GET /records/country/{country_id}` - Records for one country
//! - `GET /records/indicator/{indicator_code}` - Records for one indicator
//! - `GET /records/country/{country_id}/{indicator_code}` - Records for one country and indicator
//! - `GET /api-docs` - Swagger UI
//! - `GET /api-docs/openapi.json` - OpenAPI document
//! - `GET /metrics` - Prometheus metrics endpoint
//! - `GET /health/live` - Kubernetes liveness check
//! - `GET /health/ready` - Kubernetes readiness check

use axum::{
    Router,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
};

use globalindex_lib::{RecordQuery, resolve};
use globalindex_service_shared::{
    AppState, MetricsLayer, RecordsResponse, cors_layer, docs::OPENAPI_PATH, health_live,
    health_ready, metrics_handler, openapi_handler, record_query_outcome, swagger_ui_handler,
    trace_layer,
};

/// Default path of the Prometheus endpoint.
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

/// Plain-text body of `GET /`.
pub const WELCOME_MESSAGE: &str = "Hello from the Global Index API!
    - If you would like to see records, go to /records
    - For individual country info for all indicators, go to /records/country/{countryId}
    - For individual indicator info for all countries, go to /records/indicator/{indicatorCode}
    - For specific country and ID records, go to /records/country/{countryId}/{indicatorCode}
    - For full documentation and testing, go to /api-docs";

/// Build the full application router with metrics at [`DEFAULT_METRICS_PATH`].
pub fn build_router(state: AppState) -> Router {
    build_router_with_metrics(state, Some(DEFAULT_METRICS_PATH))
}

/// Build the application router; `metrics_path` of `None` leaves the
/// Prometheus endpoint out.
pub fn build_router_with_metrics(state: AppState, metrics_path: Option<&str>) -> Router {
    let mut router = Router::new()
        .route("/", get(welcome_handler))
        .route("/records", get(list_records))
        .route("/records/{country_id}", get(records_by_country))
        .route("/records/country/{country_id}", get(records_by_country))
        .route(
            "/records/indicator/{indicator_code}",
            get(records_by_indicator),
        )
        .route(
            "/records/country/{country_id}/{indicator_code}",
            get(records_by_country_indicator),
        )
        .route("/api-docs", get(swagger_ui_handler))
        .route(OPENAPI_PATH, get(openapi_handler))
        .route("/health/live", get(health_live))
        .route("/health/ready", get(health_ready));

    if let Some(path) = metrics_path {
        router = router.route(path, get(metrics_handler));
    }

    router
        .layer(MetricsLayer)
        .layer(trace_layer())
        .layer(cors_layer())
        .with_state(state)
}

async fn welcome_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        WELCOME_MESSAGE,
    )
}

async fn list_records(State(state): State<AppState>) -> RecordsResponse {
    run_query(&state, RecordQuery::All).await
}

async fn records_by_country(
    State(state): State<AppState>,
    Path(country_id): Path<String>,
) -> RecordsResponse {
    run_query(&state, RecordQuery::ByCountry(country_id)).await
}

async fn records_by_indicator(
    State(state): State<AppState>,
    Path(indicator_code): Path<String>,
) -> RecordsResponse {
    run_query(&state, RecordQuery::ByIndicator(indicator_code)).await
}

async fn records_by_country_indicator(
    State(state): State<AppState>,
    Path((country_id, indicator_code)): Path<(String, String)>,
) -> RecordsResponse {
    run_query(
        &state,
        RecordQuery::ByCountryAndIndicator {
            country: country_id,
            indicator: indicator_code,
        },
    )
    .await
}

async fn run_query(state: &AppState, query: RecordQuery) -> RecordsResponse {
    let outcome = resolve(state.store(), &query, state.query_timeout()).await;
    record_query_outcome(query.operation(), state.backend(), &outcome);
    RecordsResponse::from(outcome)
}
