//! SQLite connection pool setup for the job queue.
//!
//! WAL mode plus a bounded pool: write-ahead logging for concurrent worker
//! access, a busy timeout so lock contention backs off instead of erroring
//! immediately, and `sqlx::migrate!` against this crate's own
//! `migrations/` directory.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};

use crate::domain::errors::{DomainError, DomainResult};

pub async fn connect(database_url: &str) -> DomainResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| DomainError::BrokerUnavailable(format!("invalid database url: {e}")))?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5))
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(10)
        .idle_timeout(Duration::from_secs(30))
        .max_lifetime(Duration::from_secs(1800))
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
        .map_err(|e| DomainError::BrokerUnavailable(e.to_string()))?;

    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> DomainResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DomainError::BrokerUnavailable(format!("migration failed: {e}")))?;
    Ok(())
}
