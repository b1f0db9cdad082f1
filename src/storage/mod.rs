//! SQLite-backed storage capability.
//!
//! A [`Store`] is created once at startup and handed to every component that
//! touches the database. Cloning it is cheap and shares the connection pool.

pub mod queries;
pub mod record_loader;
pub mod schema;
pub mod station_resolver;

pub use queries::{Page, RecordFilter, StatisticFilter};
pub use record_loader::{LoadSummary, RecordLoader};
pub use station_resolver::StationResolver;

use crate::config::{RetrySettings, Settings};
use crate::error::{IngestError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::future::Future;
use std::str::FromStr;
use tracing::{debug, warn};

/// The three persisted tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Stations,
    Records,
    Statistics,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Stations => crate::utils::constants::STATIONS_TABLE,
            Table::Records => crate::utils::constants::RECORDS_TABLE,
            Table::Statistics => crate::utils::constants::STATISTICS_TABLE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
    retry: RetrySettings,
}

impl Store {
    /// Open the pool described by `settings` and make sure the schema exists.
    pub async fn connect(settings: &Settings) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&settings.database.url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(settings.database.busy_timeout());

        let pool = SqlitePoolOptions::new()
            .max_connections(settings.pool_size())
            .acquire_timeout(settings.database.acquire_timeout())
            .connect_with(options)
            .await?;

        debug!(
            url = %settings.database.url,
            max_connections = settings.pool_size(),
            "Connected to database"
        );

        let store = Self::from_pool(pool, settings.retry.clone());
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool, retry: RetrySettings) -> Self {
        Self { pool, retry }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create missing tables; existing tables are left untouched.
    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in schema::SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn count(&self, table: Table) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.name());
        let count = sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn is_empty(&self, table: Table) -> Result<bool> {
        Ok(self.count(table).await? == 0)
    }

    /// Run `op` with a bounded timeout per attempt, retrying transient failures.
    ///
    /// Every attempt must be safe to repeat: a timed-out attempt is dropped,
    /// which rolls back any transaction it had open.
    pub async fn with_retry<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let failure = match tokio::time::timeout(self.retry.operation_timeout(), op()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) if e.is_transient() => e,
                Ok(Err(e)) => return Err(e),
                Err(_) => IngestError::Timeout {
                    operation: operation.to_string(),
                    attempts: attempt,
                },
            };

            if attempt >= max_attempts {
                return Err(failure);
            }

            warn!(
                operation,
                attempt,
                max_attempts,
                error = %failure,
                "Transient storage failure, retrying"
            );
            tokio::time::sleep(self.retry.base_delay() * attempt).await;
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::temp_store;
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let (store, _dir) = temp_store().await;
        store.ensure_schema().await.unwrap();

        assert!(store.is_empty(Table::Stations).await.unwrap());
        assert!(store.is_empty(Table::Records).await.unwrap());
        assert!(store.is_empty(Table::Statistics).await.unwrap());
    }

    #[tokio::test]
    async fn test_retry_recovers_transient_failure() {
        let (store, _dir) = temp_store().await;
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let value = store
            .with_retry("flaky", move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(IngestError::Database(sqlx::Error::PoolTimedOut))
                } else {
                    Ok(42)
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_gives_up_on_permanent_failure() {
        let (store, _dir) = temp_store().await;
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<()> = store
            .with_retry("broken", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(IngestError::StationIntegrity {
                    name: "X".to_string(),
                })
            })
            .await;

        assert!(matches!(result, Err(IngestError::StationIntegrity { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_bounds_attempts_on_timeout() {
        let (mut store, _dir) = temp_store().await;
        store.retry.operation_timeout_secs = 1;
        store.retry.max_attempts = 2;
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<()> = store
            .with_retry("stuck", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(IngestError::Timeout { attempts: 2, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
