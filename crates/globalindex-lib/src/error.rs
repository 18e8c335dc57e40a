use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Convenient result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by a [`RecordStore`](crate::store::RecordStore) backend.
///
/// The HTTP layer does not distinguish between variants: every one of them
/// surfaces as a 500. The variants exist so logs carry the real cause.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The SQLite database file does not exist.
    #[error("database not found at {path}")]
    MissingDatabase { path: PathBuf },

    /// Establishing the backend connection failed.
    #[error("failed to connect to {backend} store: {message}")]
    Connect { backend: String, message: String },

    /// The backend rejected or failed a query.
    #[error("query failed: {message}")]
    Query { message: String },

    /// The store call did not finish within the configured timeout.
    #[error("store call timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    /// The blocking task running a SQLite query panicked or was cancelled.
    #[error("store task failed: {0}")]
    TaskJoin(String),

    /// Wrapper for SQLite errors.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Wrapper for PostgreSQL errors.
    #[error(transparent)]
    Postgres(#[from] sqlx::Error),

    /// Wrapper for MongoDB errors.
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
}

/// Invalid service configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// A variable required by the selected backend is missing.
    #[error("{key} is required when STORE_BACKEND={backend}")]
    Missing { key: String, backend: String },

    /// The refresh schedule expression is invalid.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// Errors raised while parsing or evaluating a refresh schedule.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The cron expression could not be parsed.
    #[error("invalid cron expression {expression:?}: {message}")]
    InvalidExpression { expression: String, message: String },

    /// The expression never fires after the given instant.
    #[error("cron expression {expression:?} has no upcoming occurrence")]
    NoUpcomingOccurrence { expression: String },
}

/// Errors raised while running the external refresh routine.
///
/// These never reach the HTTP surface; the runner turns them into a
/// [`RunOutcome`](crate::refresh::RunOutcome) and logs them.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// The routine could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading output or waiting for the process failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The routine ran past its deadline and was killed.
    #[error("refresh routine exceeded {}s and was killed", .after.as_secs())]
    Timeout { after: Duration },
}
