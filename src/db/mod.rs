//! Database module for the Medicare clinic store
//!
//! This module handles the SQLite connection pool, the schema migrations and
//! the translation of storage failures into typed clinic errors.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqliteConnection;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::{ClinicError, Result};

/// Database connection pool
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the store described by `config`.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .synchronous(SqliteSynchronous::Full);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await?;

        info!(url = %config.url, "connected to clinic store");
        Ok(Self { pool })
    }

    /// A private in-memory store with the schema already applied.
    ///
    /// Held on a single connection that never expires, since the data lives
    /// only as long as that connection.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let database = Self { pool };
        database.run_migrations().await?;
        Ok(database)
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Result of an update or delete addressed by key.
///
/// A key that matches nothing is not an error; it is reported as `NoMatch`
/// so callers can tell "nothing to do" apart from a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "rows", rename_all = "snake_case")]
pub enum WriteOutcome {
    Applied(u64),
    NoMatch,
}

impl WriteOutcome {
    pub fn from_rows(rows: u64) -> Self {
        if rows == 0 {
            Self::NoMatch
        } else {
            Self::Applied(rows)
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Self::NoMatch)
    }

    pub fn rows_affected(&self) -> u64 {
        match self {
            Self::Applied(rows) => *rows,
            Self::NoMatch => 0,
        }
    }
}

/// Map a failed write on behalf of patient `pid` onto the clinic error kinds.
pub(crate) fn classify(err: sqlx::Error, pid: &str) -> ClinicError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            ClinicError::DuplicateKey(pid.to_string())
        }
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            ClinicError::ForeignKeyViolation(pid.to_string())
        }
        sqlx::Error::Database(db_err) if db_err.is_check_violation() => {
            ClinicError::Validation(db_err.message().to_string())
        }
        _ => ClinicError::Database(err),
    }
}

pub(crate) async fn patient_exists(conn: &mut SqliteConnection, pid: &str) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM patients WHERE pid = ?")
        .bind(pid)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

/// Creation timestamps are stored as UTC microseconds since the epoch.
pub(crate) fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

pub(crate) fn from_micros(micros: i64) -> std::result::Result<DateTime<Utc>, sqlx::Error> {
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    DateTime::from_timestamp(secs, nanos).ok_or_else(|| sqlx::Error::ColumnDecode {
        index: "created_at".into(),
        source: format!("timestamp {} out of range", micros).into(),
    })
}

/// Decode failure for a column whose stored text does not parse.
pub(crate) fn decode_error(
    column: &str,
    source: impl std::error::Error + Send + Sync + 'static,
) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(source),
    }
}
