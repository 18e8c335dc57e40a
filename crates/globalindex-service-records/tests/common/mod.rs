#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum_test::TestServer;
use globalindex_lib::{Record, RecordStore, RefreshCommand, RefreshRunner, SqliteStore};
use globalindex_service_records::build_router;
use globalindex_service_shared::{AppState, service_info};
use globalindex_service_shared::test_utils::state_with_store;
use rusqlite::{Connection, params};
use tempfile::TempDir;

pub fn server(state: AppState) -> TestServer {
    TestServer::new(build_router(state)).expect("build test server")
}

pub fn server_with_store(store: Arc<dyn RecordStore>) -> TestServer {
    server(state_with_store(store))
}

/// A `databank` SQLite file in a temporary directory.
pub struct SqliteFixture {
    _dir: TempDir,
    pub path: PathBuf,
}

impl SqliteFixture {
    pub fn new(records: &[Record]) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("databank.db");
        let connection = Connection::open(&path).expect("create fixture database");
        connection
            .execute_batch(
                "CREATE TABLE databank (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    country_code TEXT,
                    country_name TEXT,
                    capital_city TEXT,
                    indicator_code TEXT,
                    indicator_name TEXT,
                    year INTEGER,
                    value REAL
                );",
            )
            .expect("create databank table");
        for record in records {
            connection
                .execute(
                    "INSERT INTO databank (country_code, indicator_code, year, value)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        record.country_code,
                        record.indicator_code,
                        record.year,
                        record.value
                    ],
                )
                .expect("insert fixture record");
        }
        Self { _dir: dir, path }
    }

    pub fn store(&self) -> Arc<dyn RecordStore> {
        Arc::new(SqliteStore::open(&self.path, "databank").expect("open fixture store"))
    }

    /// State over this file with `refresh` as the population routine.
    pub fn state(&self, refresh: RefreshCommand) -> AppState {
        AppState::from_components(
            self.store(),
            Arc::new(RefreshRunner::new(refresh, None)),
            None,
            service_info!(),
        )
    }
}
