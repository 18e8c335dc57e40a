//! Record store backends.
//!
//! The service reads from exactly one backend, chosen at startup from
//! [`StoreConfig`] and never switched at runtime:
//!
//! - [`SqliteStore`]: a local database file written by the population routine
//! - [`PostgresStore`]: a networked relational database
//! - [`MongoStore`]: a document collection
//!
//! Handlers only see `Arc<dyn RecordStore>`.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::record::{Record, RecordFilter};

mod mongo;
mod postgres;
mod sqlite;

pub use mongo::MongoStore;
pub use postgres::{PostgresStore, PostgresTarget};
pub use sqlite::SqliteStore;

/// Descriptive columns the population routine may add next to the core ones.
pub(crate) const OPTIONAL_COLUMNS: [&str; 3] = ["country_name", "capital_city", "indicator_name"];

/// Default table (or collection) holding the records.
pub const DEFAULT_TABLE: &str = "databank";

/// Uniform read interface over every backend.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Which backend this is.
    fn backend(&self) -> StoreBackend;

    /// Every record in the dataset.
    async fn query_all(&self) -> Result<Vec<Record>>;

    /// Records matching all equalities in `filter`. An empty filter behaves
    /// like [`query_all`](Self::query_all).
    async fn query_by_filter(&self, filter: &RecordFilter) -> Result<Vec<Record>>;

    /// Cheap round trip used by readiness checks.
    async fn ping(&self) -> Result<()>;
}

/// Available store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Postgres,
    Mongodb,
}

impl StoreBackend {
    /// Parse a backend name, accepting a few common aliases.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            "mongodb" | "mongo" => Some(Self::Mongodb),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
            Self::Mongodb => "mongodb",
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection settings for the selected backend.
#[derive(Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Sqlite {
        path: PathBuf,
        table: String,
    },
    Postgres {
        target: PostgresTarget,
        table: String,
    },
    Mongodb {
        url: String,
        database: String,
        collection: String,
    },
}

impl StoreConfig {
    pub fn backend(&self) -> StoreBackend {
        match self {
            Self::Sqlite { .. } => StoreBackend::Sqlite,
            Self::Postgres { .. } => StoreBackend::Postgres,
            Self::Mongodb { .. } => StoreBackend::Mongodb,
        }
    }
}

// Connection URLs may carry passwords.
impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite { path, table } => f
                .debug_struct("Sqlite")
                .field("path", path)
                .field("table", table)
                .finish(),
            Self::Postgres { target, table } => f
                .debug_struct("Postgres")
                .field("target", target)
                .field("table", table)
                .finish(),
            Self::Mongodb {
                database,
                collection,
                ..
            } => f
                .debug_struct("Mongodb")
                .field("url", &"<redacted>")
                .field("database", database)
                .field("collection", collection)
                .finish(),
        }
    }
}

/// Connect to the configured backend.
///
/// The connection is established exactly once; callers treat failure as
/// fatal rather than retrying.
pub async fn connect_store(config: &StoreConfig) -> Result<Arc<dyn RecordStore>> {
    info!(backend = %config.backend(), "connecting to record store");
    let store: Arc<dyn RecordStore> = match config {
        StoreConfig::Sqlite { path, table } => Arc::new(SqliteStore::open(path, table)?),
        StoreConfig::Postgres { target, table } => {
            Arc::new(PostgresStore::connect(target, table).await?)
        }
        StoreConfig::Mongodb {
            url,
            database,
            collection,
        } => Arc::new(MongoStore::connect(url, database, collection).await?),
    };
    info!(backend = %store.backend(), "record store connected");
    Ok(store)
}

/// Validate a table or collection name before it is spliced into SQL.
///
/// Only the configured name is ever interpolated; request values are always
/// bound as parameters.
pub(crate) fn checked_identifier(name: &str) -> Result<&str> {
    let valid = !name.is_empty()
        && name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(crate::error::StoreError::Query {
            message: format!("invalid table name {name:?}"),
        })
    }
}
