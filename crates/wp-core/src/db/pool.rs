//! Connection pool over SQLite or PostgreSQL.

use super::DbError;
use std::time::Duration;

#[cfg(feature = "database")]
use sqlx::{Pool, Postgres, Sqlite};

/// Backend selected by the database URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbBackend {
    Sqlite,
    Postgres,
}

impl DbBackend {
    /// Accepts `sqlite:` (including `sqlite::memory:`), `postgres://` and `postgresql://`.
    pub fn from_url(url: &str) -> Result<Self, DbError> {
        if url.starts_with("sqlite:") {
            Ok(DbBackend::Sqlite)
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(DbBackend::Postgres)
        } else {
            Err(DbError::Configuration(format!(
                "expected a sqlite: or postgres:// URL, got scheme '{}'",
                url.split(':').next().unwrap_or_default()
            )))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DbBackend::Sqlite => "sqlite",
            DbBackend::Postgres => "postgres",
        }
    }
}

#[cfg(feature = "database")]
#[derive(Clone)]
pub enum DbPool {
    Sqlite(Pool<Sqlite>),
    Postgres(Pool<Postgres>),
}

#[cfg(not(feature = "database"))]
#[derive(Clone)]
pub struct DbPool;

#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Option<Duration>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
            min_connections: 1,
            acquire_timeout: Duration::from_secs(env_or("DATABASE_ACQUIRE_TIMEOUT_SECS", 30)),
            idle_timeout: Some(Duration::from_secs(600)),
        }
    }
}

impl PoolOptions {
    /// Adjusts the options for `url`. A plain `:memory:` SQLite database exists
    /// per connection, so such pools are held to one connection.
    pub fn for_url(mut self, url: &str) -> Self {
        if url.contains(":memory:") && !url.contains("cache=shared") {
            self.max_connections = 1;
        }
        self.min_connections = self.min_connections.min(self.max_connections);
        self
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Opens a pool for `database_url` with default options.
#[cfg(feature = "database")]
pub async fn create_pool(database_url: &str) -> Result<DbPool, DbError> {
    create_pool_with_options(database_url, PoolOptions::default()).await
}

#[cfg(not(feature = "database"))]
pub async fn create_pool(_database_url: &str) -> Result<DbPool, DbError> {
    Err(DbError::Configuration(
        "built without the `database` feature".to_string(),
    ))
}

#[cfg(feature = "database")]
pub async fn create_pool_with_options(
    database_url: &str,
    options: PoolOptions,
) -> Result<DbPool, DbError> {
    let backend = DbBackend::from_url(database_url)?;
    let options = options.for_url(database_url);
    tracing::info!(
        backend = backend.as_str(),
        max_connections = options.max_connections,
        "Opening database pool"
    );

    let pool = match backend {
        DbBackend::Sqlite => DbPool::Sqlite(
            sqlx::sqlite::SqlitePoolOptions::new()
                .max_connections(options.max_connections)
                .min_connections(options.min_connections)
                .acquire_timeout(options.acquire_timeout)
                .idle_timeout(options.idle_timeout)
                .connect(database_url)
                .await?,
        ),
        DbBackend::Postgres => DbPool::Postgres(
            sqlx::postgres::PgPoolOptions::new()
                .max_connections(options.max_connections)
                .min_connections(options.min_connections)
                .acquire_timeout(options.acquire_timeout)
                .idle_timeout(options.idle_timeout)
                .connect(database_url)
                .await?,
        ),
    };
    Ok(pool)
}

#[cfg(feature = "database")]
impl DbPool {
    pub fn backend(&self) -> DbBackend {
        match self {
            DbPool::Sqlite(_) => DbBackend::Sqlite,
            DbPool::Postgres(_) => DbBackend::Postgres,
        }
    }

    /// `"sqlite"` or `"postgres"`, as reported by the health endpoint.
    pub fn db_type(&self) -> &'static str {
        self.backend().as_str()
    }

    /// Runs `SELECT 1`.
    pub async fn is_healthy(&self) -> bool {
        match self {
            DbPool::Sqlite(pool) => sqlx::query("SELECT 1").fetch_one(pool).await.is_ok(),
            DbPool::Postgres(pool) => sqlx::query("SELECT 1").fetch_one(pool).await.is_ok(),
        }
    }

    pub fn pool_size(&self) -> u32 {
        match self {
            DbPool::Sqlite(pool) => pool.size(),
            DbPool::Postgres(pool) => pool.size(),
        }
    }

    pub fn idle_connections(&self) -> usize {
        match self {
            DbPool::Sqlite(pool) => pool.num_idle(),
            DbPool::Postgres(pool) => pool.num_idle(),
        }
    }
}
