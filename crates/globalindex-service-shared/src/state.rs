//! Application state for the records service.
//!
//! The store handle and the refresh runner are built once at startup and
//! shared by every handler through axum's `State` extractor.

use std::sync::Arc;
use std::time::Duration;

use globalindex_lib::{
    connect_store, RecordStore, RefreshRunner, ServiceConfig, StoreBackend, StoreError,
};

/// Name and version a service reports about itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
}

impl ServiceInfo {
    pub const fn new(name: &'static str, version: &'static str) -> Self {
        Self { name, version }
    }
}

/// [`ServiceInfo`] of the crate this is expanded in.
#[macro_export]
macro_rules! service_info {
    () => {
        $crate::ServiceInfo::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    };
}

/// Shared application state for all axum handlers.
///
/// This struct is cheaply cloneable (using `Arc` internally) and should be
/// shared via axum's `State` extractor.
///
/// # Example
///
/// ```ignore
/// use axum::{Router, routing::get, extract::State};
/// use globalindex_service_shared::AppState;
///
/// async fn handler(State(state): State<AppState>) {
///     let records = state.store().query_all().await;
///     // ... map to a response
/// }
///
/// let state = AppState::connect(&config, service_info!()).await?;
/// let app = Router::new()
///     .route("/records", get(handler))
///     .with_state(state);
/// ```
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn RecordStore>,
    refresh: Arc<RefreshRunner>,
    query_timeout: Option<Duration>,
    service: ServiceInfo,
}

impl AppState {
    /// Connect the configured store and build the refresh runner.
    ///
    /// The store is connected exactly once. An error here means the service
    /// must not start.
    pub async fn connect(config: &ServiceConfig, service: ServiceInfo) -> Result<Self, StoreError> {
        let store = connect_store(&config.store).await?;
        let refresh = RefreshRunner::new(config.refresh.command.clone(), config.refresh.timeout)
            .with_observer(Arc::new(crate::metrics::MetricsRefreshObserver));

        tracing::info!(
            backend = %store.backend(),
            refresh_command = %refresh.command(),
            "application state ready"
        );

        Ok(Self::from_components(
            store,
            Arc::new(refresh),
            config.query_timeout,
            service,
        ))
    }

    /// Create application state from pre-built components.
    ///
    /// This is useful for testing with in-memory or failing stores.
    pub fn from_components(
        store: Arc<dyn RecordStore>,
        refresh: Arc<RefreshRunner>,
        query_timeout: Option<Duration>,
        service: ServiceInfo,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store,
                refresh,
                query_timeout,
                service,
            }),
        }
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.inner.store.as_ref()
    }

    pub fn backend(&self) -> StoreBackend {
        self.inner.store.backend()
    }

    pub fn refresh(&self) -> &RefreshRunner {
        &self.inner.refresh
    }

    /// The runner as a shareable handle, for the scheduler.
    pub fn refresh_arc(&self) -> Arc<RefreshRunner> {
        Arc::clone(&self.inner.refresh)
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.inner.query_timeout
    }

    pub fn service(&self) -> ServiceInfo {
        self.inner.service
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service", &self.inner.service.name)
            .field("backend", &self.backend())
            .field("refresh_state", &self.inner.refresh.state())
            .field("query_timeout", &self.inner.query_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{sample_records, MemoryStore};
    use globalindex_lib::{RefreshCommand, RefreshState, StoreConfig};

    fn memory_state() -> AppState {
        AppState::from_components(
            Arc::new(MemoryStore::new(sample_records())),
            Arc::new(RefreshRunner::new(RefreshCommand::default(), None)),
            Some(Duration::from_secs(2)),
            ServiceInfo::new("records-test", "1.2.3"),
        )
    }

    #[tokio::test]
    async fn test_app_state_from_components() {
        let state = memory_state();
        assert_eq!(state.backend(), StoreBackend::Sqlite);
        assert_eq!(state.refresh().state(), RefreshState::Idle);
        assert_eq!(state.query_timeout(), Some(Duration::from_secs(2)));
        assert_eq!(state.store().query_all().await.unwrap().len(), 3);
        assert_eq!(state.service().name, "records-test");
    }

    #[test]
    fn test_service_info_macro_uses_calling_crate() {
        let info = service_info!();
        assert_eq!(info.name, "globalindex-service-shared");
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_app_state_clone_shares_runner() {
        let state1 = memory_state();
        let state2 = state1.clone();
        assert!(Arc::ptr_eq(&state1.refresh_arc(), &state2.refresh_arc()));
    }

    #[test]
    fn test_app_state_debug() {
        let debug = format!("{:?}", memory_state());
        assert!(debug.contains("AppState"));
        assert!(debug.contains("backend"));
        assert!(debug.contains("refresh_state"));
    }

    #[tokio::test]
    async fn test_app_state_connect_missing_database() {
        let mut config = globalindex_lib::ServiceConfig::from_lookup(|_| None).unwrap();
        config.store = StoreConfig::Sqlite {
            path: "/nonexistent/path/to/databank.db".into(),
            table: "databank".to_string(),
        };

        match AppState::connect(&config, service_info!()).await {
            Err(StoreError::MissingDatabase { path }) => {
                assert!(path.display().to_string().contains("nonexistent"));
            }
            Err(other) => panic!("unexpected error: {:?}", other),
            Ok(_) => panic!("missing database must fail"),
        }
    }
}
