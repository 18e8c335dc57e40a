//! Global Index library entry points.
//!
//! This crate holds everything the records service does apart from HTTP:
//! the record model, the store backends, route-to-query resolution and the
//! dataset refresh job. The service binary and the CLI should only depend on
//! what is exported here instead of reimplementing behavior.
//!

#![deny(warnings)]

pub mod config;
pub mod error;
pub mod query;
pub mod record;
pub mod refresh;
pub mod store;

pub use config::{RefreshConfig, ServiceConfig};
pub use error::{ConfigError, RefreshError, Result, ScheduleError, StoreError};
pub use query::{resolve, QueryOutcome, RecordQuery, INDICATOR_NOT_FOUND, RECORD_NOT_FOUND};
pub use record::{Record, RecordField, RecordFilter};
pub use refresh::{
    spawn_refresh_scheduler, OutputLine, OutputStream, RefreshCommand, RefreshObserver,
    RefreshRunner, RefreshSchedule, RefreshState, RefreshTrigger, RunOutcome, RunResult,
    RunSummary, TriggerOutcome,
};
pub use store::{
    connect_store, MongoStore, PostgresStore, PostgresTarget, RecordStore, SqliteStore,
    StoreBackend, StoreConfig,
};
