//! Schema Introspector
//!
//! Reflects the live table and column layout of the store. The descriptor is
//! rebuilt on every call; DDL may land between two calls.

use crate::error::{QueryError, Result};
use crate::models::{ColumnDescriptor, SchemaDescriptor};
use sqlx::{Row, SqlitePool};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SchemaIntrospector {
    pool: SqlitePool,
}

impl SchemaIntrospector {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Every base table with its columns in declaration order.
    ///
    /// SQLite's own bookkeeping tables (`sqlite_sequence`, ...) are left out.
    /// Any failure aborts the whole call; a partial map is never returned.
    pub async fn describe(&self) -> Result<SchemaDescriptor> {
        let mut conn = self.pool.acquire().await.map_err(QueryError::from_acquire)?;

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )
        .fetch_all(&mut *conn)
        .await
        .map_err(introspection_error)?;

        let mut schema = SchemaDescriptor::new();
        for table in tables {
            let rows = sqlx::query(
                "SELECT name, type, \"notnull\" AS not_null, pk \
                 FROM pragma_table_info(?) ORDER BY cid",
            )
            .bind(table.as_str())
            .fetch_all(&mut *conn)
            .await
            .map_err(introspection_error)?;

            let columns = rows
                .iter()
                .map(|row| {
                    Ok(ColumnDescriptor {
                        name: row.try_get("name")?,
                        declared_type: row.try_get("type")?,
                        not_null: row.try_get::<i64, _>("not_null")? != 0,
                        primary_key: row.try_get::<i64, _>("pk")? != 0,
                    })
                })
                .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
                .map_err(introspection_error)?;

            debug!(table = %table, columns = columns.len(), "Introspected table");
            schema.insert(table, columns);
        }

        Ok(schema)
    }
}

fn introspection_error(err: sqlx::Error) -> QueryError {
    QueryError::Introspection(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_columns_in_declaration_order() {
        let pool = memory_pool().await;
        sqlx::query(
            "CREATE TABLE orders (order_id INTEGER PRIMARY KEY AUTOINCREMENT, \
             customer_id INTEGER, order_date TEXT NOT NULL, total_amount REAL)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let schema = SchemaIntrospector::new(pool).describe().await.unwrap();
        assert_eq!(schema.len(), 1, "sqlite_sequence must not leak: {:?}", schema.keys());

        let columns = &schema["orders"];
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["order_id", "customer_id", "order_date", "total_amount"]);
        assert!(columns[0].primary_key);
        assert_eq!(columns[2].declared_type, "TEXT");
        assert!(columns[2].not_null);
        assert!(!columns[3].not_null);
    }

    #[tokio::test]
    async fn test_reflects_ddl_between_calls() {
        let pool = memory_pool().await;
        let introspector = SchemaIntrospector::new(pool.clone());
        assert!(introspector.describe().await.unwrap().is_empty());

        sqlx::query("CREATE TABLE notes (body)").execute(&pool).await.unwrap();
        let schema = introspector.describe().await.unwrap();
        assert_eq!(schema["notes"][0].declared_type, "");
    }

    #[tokio::test]
    async fn test_closed_pool_is_fatal() {
        let pool = memory_pool().await;
        pool.close().await;
        let err = SchemaIntrospector::new(pool).describe().await.unwrap_err();
        assert!(err.kind().is_fatal());
    }
}
