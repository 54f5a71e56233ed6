//! PostgreSQL ledger store for `vaxbook`
//!
//! Every unit of work is one database transaction. Contended rows are locked
//! as they are read (`FOR UPDATE`), stock changes are guarded updates, and
//! the appointment identifier high-water mark lives in its own row so that
//! deleted identifiers are never handed out again.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod unit;

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::time::Duration;

use nutype::nutype;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgPoolOptions, query, Pool, Postgres};
use thiserror::Error;
use tracing::{error, info, instrument};
use vaxbook::{LedgerStore, Operation, StorageError};

pub use unit::PostgresUnit;

/// Environment variable holding the connection string.
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
/// Environment variable overriding [`PostgresConfig::max_connections`].
pub const MAX_CONNECTIONS_VAR: &str = "VAXBOOK_DB_MAX_CONNECTIONS";
/// Environment variable overriding [`PostgresConfig::acquire_timeout`], in seconds.
pub const ACQUIRE_TIMEOUT_VAR: &str = "VAXBOOK_DB_ACQUIRE_TIMEOUT_SECS";
/// Environment variable overriding [`PostgresConfig::idle_timeout`], in seconds.
pub const IDLE_TIMEOUT_VAR: &str = "VAXBOOK_DB_IDLE_TIMEOUT_SECS";

/// Errors raised while setting up the PostgreSQL store.
#[derive(Debug, Error)]
pub enum PostgresLedgerError {
    /// The connection pool could not be created.
    #[error("failed to create postgres connection pool")]
    ConnectionFailed(#[source] sqlx::Error),

    /// The database did not answer a liveness query.
    #[error("postgres ping failed")]
    PingFailed(#[source] sqlx::Error),

    /// Schema migrations could not be applied.
    #[error("postgres migration failed")]
    MigrationFailed(#[source] sqlx::migrate::MigrateError),

    /// A configuration variable could not be parsed.
    #[error("environment variable {variable} has invalid value {value:?}")]
    InvalidSetting {
        /// Name of the variable.
        variable: &'static str,
        /// The rejected value.
        value: String,
    },

    /// `DATABASE_URL` is not set.
    #[error("environment variable DATABASE_URL is not set")]
    MissingDatabaseUrl,
}

/// Maximum number of database connections in the pool.
///
/// MaxConnections represents the connection pool size limit. It must be at least 1,
/// enforced by using NonZeroU32 as the underlying type.
///
/// # Examples
///
/// ```ignore
/// use vaxbook_postgres::MaxConnections;
/// use std::num::NonZeroU32;
///
/// let small_pool = MaxConnections::new(NonZeroU32::new(5).expect("5 is non-zero"));
/// ```
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Display,
    AsRef,
    Into,
    Serialize,
    Deserialize
))]
pub struct MaxConnections(NonZeroU32);

/// Configuration for the PostgresLedgerStore connection pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    /// Maximum number of connections in the pool (default: 10)
    pub max_connections: MaxConnections,
    /// Timeout for acquiring a connection from the pool (default: 30 seconds)
    pub acquire_timeout: Duration,
    /// Idle timeout for connections in the pool (default: 10 minutes)
    pub idle_timeout: Duration,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        const DEFAULT_MAX_CONNECTIONS: NonZeroU32 = match NonZeroU32::new(10) {
            Some(v) => v,
            None => unreachable!(),
        };

        Self {
            max_connections: MaxConnections::new(DEFAULT_MAX_CONNECTIONS),
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600), // 10 minutes
        }
    }
}

impl PostgresConfig {
    /// Defaults overridden by `VAXBOOK_DB_MAX_CONNECTIONS`,
    /// `VAXBOOK_DB_ACQUIRE_TIMEOUT_SECS` and `VAXBOOK_DB_IDLE_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, PostgresLedgerError> {
        let vars: HashMap<&'static str, String> = [MAX_CONNECTIONS_VAR, ACQUIRE_TIMEOUT_VAR, IDLE_TIMEOUT_VAR]
            .into_iter()
            .filter_map(|name| std::env::var(name).ok().map(|value| (name, value)))
            .collect();
        Self::from_vars(&vars)
    }

    fn from_vars(vars: &HashMap<&'static str, String>) -> Result<Self, PostgresLedgerError> {
        let mut config = Self::default();
        if let Some(value) = vars.get(MAX_CONNECTIONS_VAR) {
            let parsed = value
                .trim()
                .parse::<NonZeroU32>()
                .map_err(|_| invalid_setting(MAX_CONNECTIONS_VAR, value))?;
            config.max_connections = MaxConnections::new(parsed);
        }
        if let Some(value) = vars.get(ACQUIRE_TIMEOUT_VAR) {
            config.acquire_timeout = parse_seconds(ACQUIRE_TIMEOUT_VAR, value)?;
        }
        if let Some(value) = vars.get(IDLE_TIMEOUT_VAR) {
            config.idle_timeout = parse_seconds(IDLE_TIMEOUT_VAR, value)?;
        }
        Ok(config)
    }
}

fn parse_seconds(variable: &'static str, value: &str) -> Result<Duration, PostgresLedgerError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| invalid_setting(variable, value))
}

fn invalid_setting(variable: &'static str, value: &str) -> PostgresLedgerError {
    PostgresLedgerError::InvalidSetting {
        variable,
        value: value.to_string(),
    }
}

/// Reads the connection string from `DATABASE_URL`.
pub fn database_url_from_env() -> Result<String, PostgresLedgerError> {
    std::env::var(DATABASE_URL_VAR)
        .ok()
        .filter(|url| !url.trim().is_empty())
        .ok_or(PostgresLedgerError::MissingDatabaseUrl)
}

/// Ledger store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: Pool<Postgres>,
}

impl PostgresLedgerStore {
    /// Create a new PostgresLedgerStore with default configuration.
    pub async fn new<S: Into<String>>(connection_string: S) -> Result<Self, PostgresLedgerError> {
        Self::with_config(connection_string, PostgresConfig::default()).await
    }

    /// Create a new PostgresLedgerStore with custom configuration.
    pub async fn with_config<S: Into<String>>(
        connection_string: S,
        config: PostgresConfig,
    ) -> Result<Self, PostgresLedgerError> {
        let connection_string = connection_string.into();
        let max_connections: NonZeroU32 = config.max_connections.into();
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.get())
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .connect(&connection_string)
            .await
            .map_err(PostgresLedgerError::ConnectionFailed)?;
        Ok(Self { pool })
    }

    /// Connects using `DATABASE_URL` and [`PostgresConfig::from_env`].
    pub async fn from_env() -> Result<Self, PostgresLedgerError> {
        Self::with_config(database_url_from_env()?, PostgresConfig::from_env()?).await
    }

    /// Create a PostgresLedgerStore from an existing connection pool.
    ///
    /// Use this when you need full control over pool configuration or want to
    /// share a pool across multiple components.
    pub fn from_pool(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// The underlying pool, for verification queries.
    pub const fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    /// Checks that the database answers.
    pub async fn ping(&self) -> Result<(), PostgresLedgerError> {
        let _ = query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(PostgresLedgerError::PingFailed)?;
        Ok(())
    }

    /// Applies the bundled schema migrations.
    #[instrument(name = "postgres.migrate", skip(self))]
    pub async fn migrate(&self) -> Result<(), PostgresLedgerError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|error| {
                error!(error = %error, "[postgres.migration_failed] schema migration failed");
                PostgresLedgerError::MigrationFailed(error)
            })?;
        info!("[postgres.migrated] schema is up to date");
        Ok(())
    }
}

impl LedgerStore for PostgresLedgerStore {
    type Unit = PostgresUnit;

    #[instrument(name = "postgres.begin", skip(self))]
    async fn begin(&self) -> Result<Self::Unit, StorageError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|error| map_sqlx_error(error, Operation::Begin))?;
        Ok(PostgresUnit::new(tx))
    }
}

pub(crate) fn map_sqlx_error(error: sqlx::Error, operation: Operation) -> StorageError {
    error!(
        error = %error,
        operation = %operation,
        "[postgres.database_error] database operation failed"
    );
    StorageError::new(operation, error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&'static str, &str)]) -> HashMap<&'static str, String> {
        pairs
            .iter()
            .map(|(name, value)| (*name, (*value).to_string()))
            .collect()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = PostgresConfig::default();
        let max: NonZeroU32 = config.max_connections.into();
        assert_eq!(max.get(), 10);
        assert_eq!(config.acquire_timeout, Duration::from_secs(30));
        assert_eq!(config.idle_timeout, Duration::from_secs(600));
    }

    #[test]
    fn no_variables_yields_defaults() {
        let config = PostgresConfig::from_vars(&HashMap::new()).unwrap();
        assert_eq!(config, PostgresConfig::default());
    }

    #[test]
    fn variables_override_defaults() {
        let config = PostgresConfig::from_vars(&vars(&[
            (MAX_CONNECTIONS_VAR, "4"),
            (ACQUIRE_TIMEOUT_VAR, " 5 "),
            (IDLE_TIMEOUT_VAR, "60"),
        ]))
        .unwrap();
        let max: NonZeroU32 = config.max_connections.into();
        assert_eq!(max.get(), 4);
        assert_eq!(config.acquire_timeout, Duration::from_secs(5));
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
    }

    #[test]
    fn zero_connections_are_rejected() {
        let error = PostgresConfig::from_vars(&vars(&[(MAX_CONNECTIONS_VAR, "0")])).unwrap_err();
        assert!(matches!(
            error,
            PostgresLedgerError::InvalidSetting { variable, .. } if variable == MAX_CONNECTIONS_VAR
        ));
    }

    #[test]
    fn non_numeric_timeout_is_rejected() {
        let error =
            PostgresConfig::from_vars(&vars(&[(IDLE_TIMEOUT_VAR, "ten minutes")])).unwrap_err();
        assert_eq!(
            error.to_string(),
            "environment variable VAXBOOK_DB_IDLE_TIMEOUT_SECS has invalid value \"ten minutes\""
        );
    }

    #[test]
    fn config_round_trips_through_json() {
        let json = serde_json::to_string(&PostgresConfig::default()).unwrap();
        let parsed: PostgresConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, PostgresConfig::default());
    }
}
