//! Test utilities for handler testing.
//!
//! This module provides in-memory stores and ready-made [`AppState`]s so
//! handlers can be exercised without a database.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use globalindex_lib::{
    Record, RecordFilter, RecordStore, RefreshCommand, RefreshRunner, StoreBackend, StoreError,
};

use crate::state::{AppState, ServiceInfo};

/// Record store over a fixed list of records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<Record>,
}

impl MemoryStore {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Sqlite
    }

    async fn query_all(&self) -> Result<Vec<Record>, StoreError> {
        Ok(self.records.clone())
    }

    async fn query_by_filter(&self, filter: &RecordFilter) -> Result<Vec<Record>, StoreError> {
        Ok(self
            .records
            .iter()
            .filter(|record| record.matches(filter))
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Store that fails every call until [`FailingStore::recover`] is called.
#[derive(Debug)]
pub struct FailingStore {
    failing: AtomicBool,
    fallback: MemoryStore,
}

impl FailingStore {
    /// Fail now; serve `records` after recovery.
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            failing: AtomicBool::new(true),
            fallback: MemoryStore::new(records),
        }
    }

    pub fn recover(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Query {
                message: "database is locked".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RecordStore for FailingStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Postgres
    }

    async fn query_all(&self) -> Result<Vec<Record>, StoreError> {
        self.check()?;
        self.fallback.query_all().await
    }

    async fn query_by_filter(&self, filter: &RecordFilter) -> Result<Vec<Record>, StoreError> {
        self.check()?;
        self.fallback.query_by_filter(filter).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check()
    }
}

/// Three records: two for `US`, one for `FR`.
pub fn sample_records() -> Vec<Record> {
    vec![
        Record::new("US", "NY.GDP.MKTP.CD", 2020, Some(21_000_000.0)),
        Record::new("US", "SP.POP.TOTL", 2020, Some(331_000_000.0)),
        Record::new("FR", "NY.GDP.MKTP.CD", 2020, Some(2_600_000.0)),
    ]
}

/// Identity reported by [`state_with_store`] states.
pub const TEST_SERVICE: ServiceInfo = ServiceInfo::new("globalindex-test-service", "0.0.0-test");

/// State over `store` with an idle runner that is never triggered.
pub fn state_with_store(store: Arc<dyn RecordStore>) -> AppState {
    AppState::from_components(
        store,
        Arc::new(RefreshRunner::new(RefreshCommand::default(), None)),
        None,
        TEST_SERVICE,
    )
}

/// State over [`sample_records`].
pub fn test_state() -> AppState {
    state_with_store(Arc::new(MemoryStore::new(sample_records())))
}

/// Generate a unique request ID for testing.
pub fn test_request_id() -> String {
    format!("test-{}", uuid::Uuid::now_v7())
}
