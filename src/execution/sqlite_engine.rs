//! SQLite execution engine
//!
//! Runs one statement per call: Classify -> Acquire -> Run -> Commit/Rollback
//! -> Release. Pool connections are returned when the guard drops, on every
//! exit path.

use crate::error::{QueryError, Result};
use crate::execution::engine::ExecutionEngine;
use crate::execution::rows::row_to_json;
use crate::models::ExecutionOutcome;
use crate::statement::{classify, StatementKind};
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct SqliteEngine {
    pool: SqlitePool,
    echo_sql: bool,
}

impl SqliteEngine {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            echo_sql: false,
        }
    }

    /// Log every statement at info level.
    pub fn with_echo(mut self, echo_sql: bool) -> Self {
        self.echo_sql = echo_sql;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run_read(&self, sql: &str) -> Result<ExecutionOutcome> {
        let mut conn = self.pool.acquire().await.map_err(QueryError::from_acquire)?;

        let rows = sqlx::query(sql)
            .fetch_all(&mut *conn)
            .await
            .map_err(statement_error)?;

        let mapped = rows
            .iter()
            .map(row_to_json)
            .collect::<Result<Vec<_>>>()?;

        debug!(rows = mapped.len(), "Read statement returned");
        Ok(ExecutionOutcome::Rows(mapped))
    }

    async fn run_write(&self, sql: &str) -> Result<ExecutionOutcome> {
        let mut tx = self.pool.begin().await.map_err(QueryError::from_acquire)?;

        match sqlx::query(sql).execute(&mut *tx).await {
            Ok(done) => {
                tx.commit().await.map_err(statement_error)?;
                debug!(rows_affected = done.rows_affected(), "Write statement committed");
                Ok(ExecutionOutcome::write(done.rows_affected()))
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Rollback after failed statement also failed: {}", rollback_err);
                }
                Err(statement_error(e))
            }
        }
    }
}

#[async_trait]
impl ExecutionEngine for SqliteEngine {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn execute(&self, sql: &str) -> Result<ExecutionOutcome> {
        let kind = classify(sql);
        if self.echo_sql {
            info!(?kind, "{}", sql);
        }

        match kind {
            StatementKind::Read => self.run_read(sql).await,
            StatementKind::Write => self.run_write(sql).await,
        }
    }

    async fn health_check(&self) -> Result<bool> {
        let mut conn = self.pool.acquire().await.map_err(QueryError::from_acquire)?;
        sqlx::query("SELECT 1")
            .execute(&mut *conn)
            .await
            .map(|_| true)
            .map_err(statement_error)
    }
}

/// Statement-level backend failures become data, not faults.
fn statement_error(err: sqlx::Error) -> QueryError {
    match err {
        sqlx::Error::Database(db) => QueryError::Execution(db.message().to_string()),
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => QueryError::from_acquire(err),
        other => QueryError::Execution(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn engine_with_table() -> SqliteEngine {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        SqliteEngine::new(pool)
    }

    async fn count(engine: &SqliteEngine) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM items")
            .fetch_one(engine.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_write_commits_and_reports_rows_affected() {
        let engine = engine_with_table().await;
        let outcome = engine
            .execute("INSERT INTO items (id, label) VALUES (1, 'a'), (2, 'b')")
            .await
            .unwrap();
        assert_eq!(outcome, ExecutionOutcome::write(2));
        assert_eq!(count(&engine).await, 2);
    }

    #[tokio::test]
    async fn test_read_returns_rows_in_column_order() {
        let engine = engine_with_table().await;
        engine
            .execute("INSERT INTO items (id, label) VALUES (1, 'a')")
            .await
            .unwrap();

        let outcome = engine.execute("  select label, id from items").await.unwrap();
        let rows = outcome.rows().unwrap();
        assert_eq!(rows.len(), 1);
        let keys: Vec<&String> = rows[0].keys().collect();
        assert_eq!(keys, vec!["label", "id"]);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_trace() {
        let engine = engine_with_table().await;
        engine
            .execute("INSERT INTO items (id, label) VALUES (1, 'a')")
            .await
            .unwrap();

        // Second row violates the primary key, so the whole statement is rolled back.
        let err = engine
            .execute("INSERT INTO items (id, label) VALUES (2, 'b'), (1, 'dup')")
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Execution(_)));
        assert_eq!(count(&engine).await, 1);
    }

    #[tokio::test]
    async fn test_missing_table_is_execution_error() {
        let engine = engine_with_table().await;
        let err = engine.execute("SELECT * FROM nowhere").await.unwrap_err();
        match err {
            QueryError::Execution(msg) => assert!(msg.contains("no such table")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_closed_pool_is_resource_error() {
        let engine = engine_with_table().await;
        engine.pool().close().await;
        let err = engine.execute("SELECT 1").await.unwrap_err();
        assert!(matches!(err, QueryError::Resource(_)));
        assert!(err.kind().is_fatal());
    }

    #[tokio::test]
    async fn test_health_check() {
        let engine = engine_with_table().await;
        assert!(engine.health_check().await.unwrap());
        assert_eq!(engine.name(), "sqlite");
    }
}
