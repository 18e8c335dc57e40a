#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use globalindex_lib::{Record, RecordFilter, RecordStore, StoreBackend, StoreError};
use rusqlite::{params, Connection};
use tempfile::TempDir;

/// Schema written by the population routine.
pub const DATABANK_SCHEMA: &str = "
    CREATE TABLE databank (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        country_code TEXT,
        country_name TEXT,
        capital_city TEXT,
        indicator_code TEXT,
        indicator_name TEXT,
        year INTEGER,
        value REAL
    );
";

/// A database file in a temporary directory, removed on drop.
pub struct SqliteFixture {
    _dir: TempDir,
    pub path: PathBuf,
}

pub fn sqlite_fixture(records: &[Record]) -> SqliteFixture {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("databank.db");
    let connection = Connection::open(&path).expect("create fixture database");
    connection
        .execute_batch(DATABANK_SCHEMA)
        .expect("create databank table");
    for record in records {
        connection
            .execute(
                "INSERT INTO databank
                    (country_code, country_name, capital_city, indicator_code, indicator_name, year, value)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.country_code,
                    record.country_name,
                    record.capital_city,
                    record.indicator_code,
                    record.indicator_name,
                    record.year,
                    record.value,
                ],
            )
            .expect("insert fixture record");
    }
    SqliteFixture { _dir: dir, path }
}

/// A handful of observations across three countries and two indicators.
pub fn sample_records() -> Vec<Record> {
    vec![
        Record::new("US", "NY.GDP.MKTP.CD", 2020, Some(21_000_000.0)),
        Record::new("US", "SP.POP.TOTL", 2020, Some(331_000_000.0)),
        Record::new("FR", "NY.GDP.MKTP.CD", 2020, Some(2_600_000.0)),
        Record::new("FR", "NY.GDP.MKTP.CD", 2019, Some(2_700_000.0)),
        Record::new("GB", "SP.POP.TOTL", 2021, None),
    ]
}

/// A store whose every call fails.
pub struct FailingStore;

#[async_trait]
impl RecordStore for FailingStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Sqlite
    }

    async fn query_all(&self) -> Result<Vec<Record>, StoreError> {
        Err(StoreError::Query {
            message: "disk I/O error".to_string(),
        })
    }

    async fn query_by_filter(&self, _filter: &RecordFilter) -> Result<Vec<Record>, StoreError> {
        self.query_all().await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Query {
            message: "disk I/O error".to_string(),
        })
    }
}

/// A store that answers only after `delay`.
pub struct SlowStore {
    pub delay: Duration,
}

#[async_trait]
impl RecordStore for SlowStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Postgres
    }

    async fn query_all(&self) -> Result<Vec<Record>, StoreError> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }

    async fn query_by_filter(&self, _filter: &RecordFilter) -> Result<Vec<Record>, StoreError> {
        self.query_all().await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
