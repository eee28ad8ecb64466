//! User repository for database operations.

use super::DbError;
#[cfg(feature = "database")]
use super::{
    parse_db_enum, parse_db_timestamp, parse_db_uuid, parse_opt_db_timestamp, to_db_timestamp,
    DbPool,
};
use crate::auth::User;
use async_trait::async_trait;
#[cfg(feature = "database")]
use chrono::{DateTime, Utc};
#[cfg(feature = "database")]
use std::sync::Arc;
use uuid::Uuid;

/// Repository trait for user persistence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Creates a new user. A duplicate email yields `DbError::Duplicate`.
    async fn create(&self, user: &User) -> Result<User, DbError>;

    /// Gets a user by ID.
    async fn get(&self, id: Uuid) -> Result<Option<User>, DbError>;

    /// Gets a user by (already normalized) email.
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, DbError>;

    /// Updates a user's last login timestamp.
    async fn update_last_login(&self, id: Uuid) -> Result<(), DbError>;

    /// Checks if any users exist (for initial setup).
    async fn any_exist(&self) -> Result<bool, DbError>;
}

#[cfg(feature = "database")]
const SELECT_USER: &str = "SELECT id, email, name, password_hash, role, status, last_login_at, deleted_at, created_at, updated_at FROM users";

/// SQLite implementation of UserRepository.
#[cfg(feature = "database")]
pub struct SqliteUserRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteUserRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: &User) -> Result<User, DbError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, password_hash, role, status, last_login_at, deleted_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .bind(user.last_login_at.as_ref().map(to_db_timestamp))
        .bind(user.deleted_at.as_ref().map(to_db_timestamp))
        .bind(to_db_timestamp(&user.created_at))
        .bind(to_db_timestamp(&user.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(user.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>, DbError> {
        let row: Option<SqliteUserRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_USER))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let row: Option<SqliteUserRow> =
            sqlx::query_as(&format!("{} WHERE email = ?", SELECT_USER))
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn update_last_login(&self, id: Uuid) -> Result<(), DbError> {
        let now = to_db_timestamp(&Utc::now());

        let result = sqlx::query("UPDATE users SET last_login_at = ?, updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(&now)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }

    async fn any_exist(&self) -> Result<bool, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }
}

/// PostgreSQL implementation of UserRepository.
#[cfg(feature = "database")]
pub struct PgUserRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgUserRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: &User) -> Result<User, DbError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, password_hash, role, status, last_login_at, deleted_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .bind(user.last_login_at)
        .bind(user.deleted_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(user.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>, DbError> {
        let row: Option<PgUserRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_USER))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let row: Option<PgUserRow> = sqlx::query_as(&format!("{} WHERE email = $1", SELECT_USER))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn update_last_login(&self, id: Uuid) -> Result<(), DbError> {
        let result =
            sqlx::query("UPDATE users SET last_login_at = NOW(), updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }

    async fn any_exist(&self) -> Result<bool, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_user_repository(pool: &DbPool) -> Arc<dyn UserRepository> {
    match pool {
        DbPool::Sqlite(pool) => Arc::new(SqliteUserRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Arc::new(PgUserRepository::new(pool.clone())),
    }
}

// Helper structs for SQLx row mapping

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct SqliteUserRow {
    id: String,
    email: String,
    name: String,
    password_hash: String,
    role: String,
    status: String,
    last_login_at: Option<String>,
    deleted_at: Option<String>,
    created_at: String,
    updated_at: String,
}

#[cfg(feature = "database")]
impl TryFrom<SqliteUserRow> for User {
    type Error = DbError;

    fn try_from(row: SqliteUserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: parse_db_uuid(&row.id)?,
            email: row.email,
            name: row.name,
            password_hash: row.password_hash,
            role: parse_db_enum(&row.role, "role")?,
            status: parse_db_enum(&row.status, "user status")?,
            last_login_at: parse_opt_db_timestamp(row.last_login_at)?,
            deleted_at: parse_opt_db_timestamp(row.deleted_at)?,
            created_at: parse_db_timestamp(&row.created_at)?,
            updated_at: parse_db_timestamp(&row.updated_at)?,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgUserRow {
    id: Uuid,
    email: String,
    name: String,
    password_hash: String,
    role: String,
    status: String,
    last_login_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[cfg(feature = "database")]
impl TryFrom<PgUserRow> for User {
    type Error = DbError;

    fn try_from(row: PgUserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            email: row.email,
            name: row.name,
            password_hash: row.password_hash,
            role: parse_db_enum(&row.role, "role")?,
            status: parse_db_enum(&row.status, "user status")?,
            last_login_at: row.last_login_at,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
