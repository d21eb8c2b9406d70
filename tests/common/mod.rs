use sqlx::SqlitePool;
use tempfile::TempDir;
use text_to_sql::config::Settings;
use text_to_sql::db::init_pool;
use text_to_sql::db::seed::seed_sample_data;

/// On-disk sample database in a temp directory. Keep the `TempDir` alive for
/// as long as the pool is used.
pub async fn seeded_pool() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().unwrap();
    let settings = Settings {
        database_url: format!("sqlite://{}", dir.path().join("sample.db").display()),
        max_connections: 4,
        ..Settings::default()
    };
    let pool = init_pool(&settings).await.unwrap();
    seed_sample_data(&pool).await.unwrap();
    (dir, pool)
}

pub async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}
