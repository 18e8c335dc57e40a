//! Service configuration read from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `API_PORT` | `5000` |
//! | `STORE_BACKEND` | `sqlite` |
//! | `SQLITE_PATH` | `databank.db` |
//! | `RECORDS_TABLE` | `databank` |
//! | `DATABASE_URL` | built from `DB_HOST`, `DB_PORT`, `DATABASE_NAME`, `DB_USERNAME`, `DB_PASSWORD` |
//! | `MONGODB_URL` | required for `mongodb` |
//! | `MONGODB_DATABASE` | `global-index` |
//! | `QUERY_TIMEOUT_SECS` | unset |
//! | `REFRESH_COMMAND` | `populate_db` |
//! | `REFRESH_ARGS` | empty |
//! | `REFRESH_WORKDIR` | unset |
//! | `REFRESH_SCHEDULE` | `0 0 1 1 *` |
//! | `REFRESH_ON_STARTUP` | `true` |
//! | `REFRESH_TIMEOUT_SECS` | unset |
//!
//! Logging and metrics switches (`LOG_FORMAT`, `RUST_LOG`, `METRICS_ENABLED`)
//! are read by the service crate.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::refresh::{RefreshCommand, RefreshSchedule, DEFAULT_REFRESH_SCHEDULE};
use crate::store::{PostgresTarget, StoreBackend, StoreConfig, DEFAULT_TABLE};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_SQLITE_PATH: &str = "databank.db";
pub const DEFAULT_MONGODB_DATABASE: &str = "global-index";
const DEFAULT_POSTGRES_PORT: u16 = 5432;

/// Everything the records service needs at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub store: StoreConfig,
    pub query_timeout: Option<Duration>,
    pub refresh: RefreshConfig,
}

/// Refresh job settings.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub command: RefreshCommand,
    pub schedule: RefreshSchedule,
    pub run_on_startup: bool,
    pub timeout: Option<Duration>,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            command: RefreshCommand::default(),
            schedule: RefreshSchedule::default(),
            run_on_startup: true,
            timeout: None,
        }
    }
}

impl ServiceConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let port = env.parse("API_PORT")?.unwrap_or(DEFAULT_PORT);
        let store = store_config(&env)?;
        let query_timeout = env.seconds("QUERY_TIMEOUT_SECS")?;
        let refresh = refresh_config(&env)?;

        Ok(Self {
            port,
            store,
            query_timeout,
            refresh,
        })
    }
}

/// Resolve only the store settings, for tools that never serve HTTP.
pub fn store_config_from_lookup<F>(lookup: F) -> Result<StoreConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    store_config(&Env(lookup))
}

/// Resolve only the refresh settings.
pub fn refresh_config_from_lookup<F>(lookup: F) -> Result<RefreshConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    refresh_config(&Env(lookup))
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|value| {
                value.parse::<T>().map_err(|e| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.clone(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    fn seconds(&self, key: &str) -> Result<Option<Duration>, ConfigError> {
        match self.parse::<u64>(key)? {
            Some(0) => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: "0".to_string(),
                reason: "must be at least one second".to_string(),
            }),
            other => Ok(other.map(Duration::from_secs)),
        }
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        let Some(value) = self.get(key) else {
            return Ok(default);
        };
        match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value,
                reason: "expected true or false".to_string(),
            }),
        }
    }
}

fn store_config<F>(env: &Env<F>) -> Result<StoreConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let backend = match env.get("STORE_BACKEND") {
        None => StoreBackend::Sqlite,
        Some(value) => StoreBackend::parse(&value).ok_or_else(|| ConfigError::InvalidValue {
            key: "STORE_BACKEND".to_string(),
            value: value.clone(),
            reason: "expected sqlite, postgres or mongodb".to_string(),
        })?,
    };
    let table = env
        .get("RECORDS_TABLE")
        .unwrap_or_else(|| DEFAULT_TABLE.to_string());

    Ok(match backend {
        StoreBackend::Sqlite => StoreConfig::Sqlite {
            path: PathBuf::from(
                env.get("SQLITE_PATH")
                    .unwrap_or_else(|| DEFAULT_SQLITE_PATH.to_string()),
            ),
            table,
        },
        StoreBackend::Postgres => StoreConfig::Postgres {
            target: postgres_target(env)?,
            table,
        },
        StoreBackend::Mongodb => StoreConfig::Mongodb {
            url: env.get("MONGODB_URL").ok_or_else(|| ConfigError::Missing {
                key: "MONGODB_URL".to_string(),
                backend: backend.to_string(),
            })?,
            database: env
                .get("MONGODB_DATABASE")
                .unwrap_or_else(|| DEFAULT_MONGODB_DATABASE.to_string()),
            collection: table,
        },
    })
}

fn postgres_target<F>(env: &Env<F>) -> Result<PostgresTarget, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = env.get("DATABASE_URL") {
        return Ok(PostgresTarget::Url(url));
    }

    let missing = |key: &str| ConfigError::Missing {
        key: key.to_string(),
        backend: StoreBackend::Postgres.to_string(),
    };
    Ok(PostgresTarget::Parts {
        host: env
            .get("DB_HOST")
            .ok_or_else(|| missing("DATABASE_URL or DB_HOST"))?,
        port: env.parse::<u16>("DB_PORT")?.unwrap_or(DEFAULT_POSTGRES_PORT),
        database: env.get("DATABASE_NAME").ok_or_else(|| missing("DATABASE_NAME"))?,
        username: env.get("DB_USERNAME"),
        password: env.get("DB_PASSWORD"),
    })
}

fn refresh_config<F>(env: &Env<F>) -> Result<RefreshConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut command = match env.get("REFRESH_COMMAND") {
        Some(program) => RefreshCommand::new(program),
        None => RefreshCommand::default(),
    };
    if let Some(args) = env.get("REFRESH_ARGS") {
        command = command.with_args(args.split_whitespace());
    }
    if let Some(dir) = env.get("REFRESH_WORKDIR") {
        command = command.with_working_dir(dir);
    }

    let schedule = RefreshSchedule::parse(
        &env.get("REFRESH_SCHEDULE")
            .unwrap_or_else(|| DEFAULT_REFRESH_SCHEDULE.to_string()),
    )?;

    Ok(RefreshConfig {
        command,
        schedule,
        run_on_startup: env.flag("REFRESH_ON_STARTUP", true)?,
        timeout: env.seconds("REFRESH_TIMEOUT_SECS")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ServiceConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(
            config.store,
            StoreConfig::Sqlite {
                path: PathBuf::from("databank.db"),
                table: "databank".to_string(),
            }
        );
        assert!(config.query_timeout.is_none());
        assert_eq!(config.refresh.command.program, "populate_db");
        assert_eq!(config.refresh.schedule.expression(), "0 0 1 1 *");
        assert!(config.refresh.run_on_startup);
        assert!(config.refresh.timeout.is_none());
    }

    #[test]
    fn test_port_must_be_numeric() {
        let err = config_from(&[("API_PORT", "http")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "API_PORT"));
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = config_from(&[("API_PORT", ""), ("STORE_BACKEND", "  ")]).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.store.backend(), StoreBackend::Sqlite);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let err = config_from(&[("STORE_BACKEND", "redis")]).unwrap_err();
        assert!(err.to_string().contains("STORE_BACKEND"));
    }

    #[test]
    fn test_postgres_target_from_parts() {
        let config = config_from(&[
            ("STORE_BACKEND", "postgres"),
            ("DB_HOST", "db.internal"),
            ("DATABASE_NAME", "global"),
            ("DB_USERNAME", "reader"),
            ("DB_PASSWORD", "p@ss word"),
        ])
        .unwrap();
        match config.store {
            StoreConfig::Postgres { target, table } => {
                assert_eq!(
                    target,
                    PostgresTarget::Parts {
                        host: "db.internal".to_string(),
                        port: 5432,
                        database: "global".to_string(),
                        username: Some("reader".to_string()),
                        password: Some("p@ss word".to_string()),
                    }
                );
                assert_eq!(table, "databank");
            }
            other => panic!("unexpected store config: {other:?}"),
        }
    }

    #[test]
    fn test_database_url_wins() {
        let config = config_from(&[
            ("STORE_BACKEND", "pg"),
            ("DATABASE_URL", "postgres://localhost/global"),
            ("DB_HOST", "ignored"),
        ])
        .unwrap();
        assert!(matches!(
            config.store,
            StoreConfig::Postgres { target: PostgresTarget::Url(ref url), .. }
                if url == "postgres://localhost/global"
        ));
    }

    #[test]
    fn test_postgres_requires_host() {
        let err = config_from(&[("STORE_BACKEND", "postgres")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { .. }));
    }

    #[test]
    fn test_mongodb_requires_url() {
        let err = config_from(&[("STORE_BACKEND", "mongodb")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "MONGODB_URL is required when STORE_BACKEND=mongodb"
        );

        let config = config_from(&[
            ("STORE_BACKEND", "mongo"),
            ("MONGODB_URL", "mongodb://localhost:27017"),
        ])
        .unwrap();
        assert_eq!(
            config.store,
            StoreConfig::Mongodb {
                url: "mongodb://localhost:27017".to_string(),
                database: "global-index".to_string(),
                collection: "databank".to_string(),
            }
        );
    }

    #[test]
    fn test_refresh_settings() {
        let config = config_from(&[
            ("REFRESH_COMMAND", "python"),
            ("REFRESH_ARGS", "scripts/populate_db.py  --quiet"),
            ("REFRESH_WORKDIR", "/srv/global-index"),
            ("REFRESH_SCHEDULE", "0 3 * * *"),
            ("REFRESH_ON_STARTUP", "false"),
            ("REFRESH_TIMEOUT_SECS", "600"),
            ("QUERY_TIMEOUT_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(
            config.refresh.command.to_string(),
            "python scripts/populate_db.py --quiet"
        );
        assert_eq!(
            config.refresh.command.working_dir,
            Some(PathBuf::from("/srv/global-index"))
        );
        assert_eq!(config.refresh.schedule.expression(), "0 3 * * *");
        assert!(!config.refresh.run_on_startup);
        assert_eq!(config.refresh.timeout, Some(Duration::from_secs(600)));
        assert_eq!(config.query_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_bad_schedule_rejected() {
        let err = config_from(&[("REFRESH_SCHEDULE", "yearly-ish")]).unwrap_err();
        assert!(matches!(err, ConfigError::Schedule(_)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(config_from(&[("QUERY_TIMEOUT_SECS", "0")]).is_err());
        assert!(config_from(&[("REFRESH_ON_STARTUP", "maybe")]).is_err());
    }
}
