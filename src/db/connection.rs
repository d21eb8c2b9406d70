//! Database connection management using sqlx

use crate::config::Settings;
use crate::error::{QueryError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

pub type DbPool = SqlitePool;

/// Initialize the connection pool described by `settings`.
///
/// The pool is the process-wide session factory; callers pass it explicitly
/// to whatever needs a connection.
pub async fn init_pool(settings: &Settings) -> Result<DbPool> {
    if !settings.database_url.starts_with("sqlite:") {
        return Err(QueryError::Config(format!(
            "DATABASE_URL must be a sqlite: URL, got '{}'",
            settings.database_url
        )));
    }

    let options = SqliteConnectOptions::from_str(&settings.database_url)
        .map_err(|e| QueryError::Config(format!("DATABASE_URL: {}", e)))?
        .create_if_missing(true)
        .foreign_keys(true);

    if let Some(parent) = options.get_filename().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout)
        .connect_with(options)
        .await
        .map_err(|e| QueryError::Resource(format!("Failed to open database: {}", e)))?;

    // Test the connection
    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .map_err(QueryError::from_acquire)?;

    info!(
        database_url = %settings.database_url,
        max_connections = settings.max_connections,
        "Database pool ready"
    );

    Ok(pool)
}
