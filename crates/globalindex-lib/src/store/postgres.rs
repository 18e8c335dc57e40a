use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::debug;

use super::{checked_identifier, RecordStore, StoreBackend, OPTIONAL_COLUMNS};
use crate::error::{Result, StoreError};
use crate::record::{Record, RecordFilter};

/// Where to find the Postgres server.
#[derive(Clone, PartialEq, Eq)]
pub enum PostgresTarget {
    /// A full connection URL, used as given.
    Url(String),
    /// Individual settings; credentials are passed to the driver unencoded.
    Parts {
        host: String,
        port: u16,
        database: String,
        username: Option<String>,
        password: Option<String>,
    },
}

impl PostgresTarget {
    /// Driver options for this target.
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        match self {
            Self::Url(url) => url.parse::<PgConnectOptions>().map_err(connect_error),
            Self::Parts {
                host,
                port,
                database,
                username,
                password,
            } => {
                let mut options = PgConnectOptions::new()
                    .host(host)
                    .port(*port)
                    .database(database);
                if let Some(username) = username {
                    options = options.username(username);
                }
                if let Some(password) = password {
                    options = options.password(password);
                }
                Ok(options)
            }
        }
    }
}

// URLs and passwords stay out of logs.
impl fmt::Debug for PostgresTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(_) => f.debug_tuple("Url").field(&"<redacted>").finish(),
            Self::Parts {
                host,
                port,
                database,
                username,
                ..
            } => f
                .debug_struct("Parts")
                .field("host", host)
                .field("port", port)
                .field("database", database)
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

fn connect_error(e: sqlx::Error) -> StoreError {
    StoreError::Connect {
        backend: StoreBackend::Postgres.to_string(),
        message: e.to_string(),
    }
}

/// Record store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    table: String,
}

impl PostgresStore {
    /// Create the pool and verify the server answers.
    pub async fn connect(target: &PostgresTarget, table: &str) -> Result<Self> {
        let table = checked_identifier(table)?.to_string();
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(target.connect_options()?)
            .await
            .map_err(connect_error)?;
        Ok(Self { pool, table })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool, table: &str) -> Result<Self> {
        let table = checked_identifier(table)?.to_string();
        Ok(Self { pool, table })
    }

    /// Optional descriptive columns the table currently has.
    async fn present_optional_columns(&self) -> Result<Vec<&'static str>> {
        let columns: Vec<String> = sqlx::query_scalar(
            "SELECT column_name::TEXT FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = lower($1)",
        )
        .bind(&self.table)
        .fetch_all(&self.pool)
        .await?;

        Ok(OPTIONAL_COLUMNS
            .into_iter()
            .filter(|wanted| columns.iter().any(|c| c.eq_ignore_ascii_case(wanted)))
            .collect())
    }
}

#[async_trait]
impl RecordStore for PostgresStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Postgres
    }

    async fn query_all(&self) -> Result<Vec<Record>> {
        self.query_by_filter(&RecordFilter::all()).await
    }

    async fn query_by_filter(&self, filter: &RecordFilter) -> Result<Vec<Record>> {
        let present = self.present_optional_columns().await?;
        let sql = build_select(&self.table, &present, filter);
        debug!(sql = %sql, "running postgres record query");

        let mut query = sqlx::query_as::<_, Record>(&sql);
        for (_, value) in filter.conditions() {
            query = query.bind(value);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn build_select(table: &str, present: &[&str], filter: &RecordFilter) -> String {
    let mut selects = vec![
        "country_code".to_string(),
        "indicator_code".to_string(),
        "year::INT4 AS year".to_string(),
        "value::FLOAT8 AS value".to_string(),
    ];
    for column in OPTIONAL_COLUMNS {
        if present.contains(&column) {
            selects.push(format!("{column}::TEXT AS {column}"));
        } else {
            selects.push(format!("NULL::TEXT AS {column}"));
        }
    }

    let mut sql = format!(
        "SELECT {} FROM {table} \
         WHERE country_code IS NOT NULL AND indicator_code IS NOT NULL AND year IS NOT NULL",
        selects.join(", ")
    );
    for (index, (field, _)) in filter.conditions().enumerate() {
        sql.push_str(&format!(" AND {} = ${}", field.column(), index + 1));
    }
    sql
}
