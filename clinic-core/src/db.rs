use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::config::{CacheConfig, DatabaseConfig};

pub async fn create_pool(
    database: &DatabaseConfig,
    cache: &CacheConfig,
) -> Result<SqlitePool, sqlx::Error> {
    let opts = SqliteConnectOptions::from_str(&database.url)?
        .create_if_missing(!cache.read_only)
        .read_only(cache.read_only)
        // Prevent transient "database is locked" errors under concurrent handlers.
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(database.max_connections)
        .connect_with(opts)
        .await
}

/// Single-connection in-memory database. Every pooled connection to
/// `sqlite::memory:` would otherwise see its own empty database.
pub async fn memory_pool() -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
}

pub async fn health_check(pool: &SqlitePool) -> Result<String, sqlx::Error> {
    let row: (String,) = sqlx::query_as("SELECT sqlite_version()").fetch_one(pool).await?;
    Ok(row.0)
}
