use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use log::debug;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Sqlite, Transaction};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Database manager for handling SQLite operations.
///
/// The pool holds a single connection, so writes from any task are serialised by the pool
/// itself. Clones share the pool: closing one handle invalidates all of them.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database file at `path`
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        debug!("Opening store at {}", path.display());
        Self::connect(options).await
    }

    /// Open a private in-memory database
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        Self::connect(options).await
    }

    async fn connect(options: SqliteConnectOptions) -> Result<Self> {
        // An in-memory database lives only as long as its connection, so keep the one
        // connection open for the lifetime of the pool.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Run each DDL statement of `schema`
    pub async fn init_schema(&self, schema: &[&str]) -> Result<()> {
        let pool = self.pool()?;
        for statement in schema {
            sqlx::query(statement).execute(pool).await?;
        }
        Ok(())
    }

    /// The underlying pool, or `StoreClosed` once the handle has been invalidated
    pub fn pool(&self) -> Result<&SqlitePool> {
        if self.pool.is_closed() {
            return Err(Error::StoreClosed);
        }
        Ok(&self.pool)
    }

    /// Start a write transaction
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        let tx = self.pool()?.begin().await?;
        Ok(tx)
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Close the pool; every clone of this handle becomes invalid
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

pub(crate) fn to_millis(time: &DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

pub(crate) fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| Error::cast(format!("timestamp {} out of range", millis)))
}

/// Initialize an in-memory database for testing
#[cfg(test)]
pub async fn init_test_db() -> Result<Database> {
    Database::in_memory().await
}
