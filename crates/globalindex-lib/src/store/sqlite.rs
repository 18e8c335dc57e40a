use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params_from_iter, Connection, OpenFlags, Row};
use tracing::debug;

use super::{checked_identifier, RecordStore, StoreBackend, OPTIONAL_COLUMNS};
use crate::error::{Result, StoreError};
use crate::record::{Record, RecordFilter};

/// Record store backed by a local SQLite file.
///
/// A single connection is opened up front and shared; queries run on the
/// blocking thread pool so they never stall the async runtime.
#[derive(Clone)]
pub struct SqliteStore {
    connection: Arc<Mutex<Connection>>,
    table: String,
}

impl SqliteStore {
    /// Open an existing database file read-only.
    ///
    /// The file must already exist: silently creating an empty database would
    /// hide a misconfigured path behind empty responses.
    pub fn open(path: impl AsRef<Path>, table: &str) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StoreError::MissingDatabase {
                path: path.to_path_buf(),
            });
        }

        let connection = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        debug!(path = %path.display(), table, "opened sqlite record store");
        Self::from_connection(connection, table)
    }

    /// Wrap an already open connection (used for in-memory databases).
    pub fn from_connection(connection: Connection, table: &str) -> Result<Self> {
        let table = checked_identifier(table)?.to_string();
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            table,
        })
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &str) -> Result<T> + Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        let table = self.table.clone();
        tokio::task::spawn_blocking(move || {
            let guard = connection.lock().map_err(|_| StoreError::Query {
                message: "sqlite connection lock poisoned".to_string(),
            })?;
            f(&guard, &table)
        })
        .await
        .map_err(|e| StoreError::TaskJoin(e.to_string()))?
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Sqlite
    }

    async fn query_all(&self) -> Result<Vec<Record>> {
        self.query_by_filter(&RecordFilter::all()).await
    }

    async fn query_by_filter(&self, filter: &RecordFilter) -> Result<Vec<Record>> {
        let filter = filter.clone();
        self.run(move |connection, table| select_records(connection, table, &filter))
            .await
    }

    async fn ping(&self) -> Result<()> {
        self.run(|connection, _| {
            connection.query_row("SELECT 1", [], |_| Ok(()))?;
            Ok(())
        })
        .await
    }
}

fn select_records(connection: &Connection, table: &str, filter: &RecordFilter) -> Result<Vec<Record>> {
    let present = present_optional_columns(connection, table)?;
    let sql = build_select(table, &present, filter);
    debug!(sql = %sql, "running sqlite record query");

    let values: Vec<&str> = filter.conditions().map(|(_, value)| value).collect();
    let mut stmt = connection.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values), row_to_record)?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

fn build_select(table: &str, present: &[&str], filter: &RecordFilter) -> String {
    let mut selects = vec![
        "country_code".to_string(),
        "indicator_code".to_string(),
        "CAST(year AS INTEGER) AS year".to_string(),
        "CAST(value AS REAL) AS value".to_string(),
    ];
    for column in OPTIONAL_COLUMNS {
        if present.contains(&column) {
            selects.push(column.to_string());
        } else {
            selects.push(format!("NULL AS {column}"));
        }
    }

    // Rows left behind by the outer join in the population routine have no
    // indicator or year; they are not observations.
    let mut conditions = vec![
        "country_code IS NOT NULL".to_string(),
        "indicator_code IS NOT NULL".to_string(),
        "year IS NOT NULL".to_string(),
    ];
    for (index, (field, _)) in filter.conditions().enumerate() {
        conditions.push(format!("{} = ?{}", field.column(), index + 1));
    }

    format!(
        "SELECT {selects} FROM {table} WHERE {conditions}",
        selects = selects.join(", "),
        conditions = conditions.join(" AND ")
    )
}

fn present_optional_columns(connection: &Connection, table: &str) -> Result<Vec<&'static str>> {
    let pragma = format!("PRAGMA table_info('{table}')");
    let mut stmt = connection.prepare(&pragma)?;
    let mut rows = stmt.query([])?;

    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        columns.push(name);
    }

    Ok(OPTIONAL_COLUMNS
        .into_iter()
        .filter(|wanted| columns.iter().any(|c| c.eq_ignore_ascii_case(wanted)))
        .collect())
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        country_code: row.get("country_code")?,
        country_name: row.get("country_name")?,
        capital_city: row.get("capital_city")?,
        indicator_code: row.get("indicator_code")?,
        indicator_name: row.get("indicator_name")?,
        year: row.get("year")?,
        value: row.get("value")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_store(schema_and_data: &str) -> SqliteStore {
        let connection = Connection::open_in_memory().unwrap();
        connection.execute_batch(schema_and_data).unwrap();
        SqliteStore::from_connection(connection, "databank").unwrap()
    }

    const CORE_SCHEMA: &str = r#"
        CREATE TABLE databank (
            country_code TEXT,
            indicator_code TEXT,
            year INTEGER,
            value REAL
        );
    "#;

    #[test]
    fn select_binds_filter_values_in_order() {
        let sql = build_select(
            "databank",
            &[],
            &RecordFilter::country_and_indicator("US", "NY.GDP"),
        );
        assert!(sql.contains("country_code = ?1"));
        assert!(sql.contains("indicator_code = ?2"));
        assert!(!sql.contains("US"));
        assert!(sql.contains("NULL AS country_name"));
    }

    #[tokio::test]
    async fn queries_core_schema() {
        let store = memory_store(&format!(
            "{}
            INSERT INTO databank VALUES ('US', 'NY.GDP', 2020, 21000000);
            INSERT INTO databank VALUES ('FR', 'NY.GDP', 2020, 2600000);
            INSERT INTO databank VALUES ('US', 'SP.POP', 2020, NULL);",
            CORE_SCHEMA
        ));

        let all = store.query_all().await.unwrap();
        assert_eq!(all.len(), 3);

        let us = store.query_by_filter(&RecordFilter::country("US")).await.unwrap();
        assert_eq!(us.len(), 2);
        assert!(us.iter().all(|r| r.country_code == "US"));

        let pop = store
            .query_by_filter(&RecordFilter::country_and_indicator("US", "SP.POP"))
            .await
            .unwrap();
        assert_eq!(pop, vec![Record::new("US", "SP.POP", 2020, None)]);
    }

    #[tokio::test]
    async fn reads_descriptive_columns_when_present() {
        let store = memory_store(
            r#"
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
            INSERT INTO databank (country_code, country_name, capital_city, indicator_code, indicator_name, year, value)
            VALUES ('KE', 'Kenya', 'Nairobi', 'NY.GDP', 'GDP (current US$)', 2022, 113420000000.0);
            "#,
        );

        let records = store.query_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].country_name.as_deref(), Some("Kenya"));
        assert_eq!(records[0].capital_city.as_deref(), Some("Nairobi"));
        assert_eq!(records[0].indicator_name.as_deref(), Some("GDP (current US$)"));
    }

    #[tokio::test]
    async fn skips_rows_without_observation() {
        let store = memory_store(&format!(
            "{}
            INSERT INTO databank VALUES ('AW', NULL, NULL, NULL);
            INSERT INTO databank VALUES ('US', 'NY.GDP', 2020, 1.0);",
            CORE_SCHEMA
        ));

        let all = store.query_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].country_code, "US");
    }

    #[tokio::test]
    async fn missing_table_is_a_query_error() {
        let store = memory_store("CREATE TABLE other (x INTEGER);");
        let err = store.query_all().await.unwrap_err();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }

    #[tokio::test]
    async fn ping_succeeds_on_open_connection() {
        let store = memory_store(CORE_SCHEMA);
        store.ping().await.unwrap();
        assert_eq!(store.backend(), StoreBackend::Sqlite);
    }

    #[test]
    fn open_rejects_missing_file() {
        let result = SqliteStore::open("/nonexistent/path/databank.db", "databank");
        match result {
            Err(StoreError::MissingDatabase { path }) => {
                assert!(path.display().to_string().contains("nonexistent"));
            }
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("expected missing database error"),
        }
    }
}
