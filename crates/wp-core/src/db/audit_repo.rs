//! Audit log repository for database operations.

use super::DbError;
#[cfg(feature = "database")]
use super::{parse_db_enum, parse_db_timestamp, parse_db_uuid, to_db_timestamp, DbPool};
use crate::audit::AuditLog;
use async_trait::async_trait;
#[cfg(feature = "database")]
use chrono::{DateTime, Utc};
#[cfg(feature = "database")]
use std::sync::Arc;
use uuid::Uuid;

/// Repository trait for audit log persistence. Entries are append-only.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Appends an audit entry.
    async fn create(&self, entry: &AuditLog) -> Result<AuditLog, DbError>;

    /// Lists entries for one resource, newest first.
    async fn list_for_resource(
        &self,
        resource_type: &str,
        resource_id: Uuid,
    ) -> Result<Vec<AuditLog>, DbError>;
}

#[cfg(feature = "database")]
const SELECT_AUDIT: &str = "SELECT id, user_id, action, resource_type, resource_id, previous_values, new_values, ip_address, user_agent, status, error_message, created_at FROM audit_logs";

/// SQLite implementation of AuditRepository.
#[cfg(feature = "database")]
pub struct SqliteAuditRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteAuditRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl AuditRepository for SqliteAuditRepository {
    async fn create(&self, entry: &AuditLog) -> Result<AuditLog, DbError> {
        let previous = entry
            .previous_values
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let new = entry
            .new_values
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, user_id, action, resource_type, resource_id, previous_values, new_values, ip_address, user_agent, status, error_message, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.user_id.to_string())
        .bind(&entry.action)
        .bind(&entry.resource_type)
        .bind(entry.resource_id.to_string())
        .bind(&previous)
        .bind(&new)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(entry.status.as_str())
        .bind(&entry.error_message)
        .bind(to_db_timestamp(&entry.created_at))
        .execute(&self.pool)
        .await?;

        Ok(entry.clone())
    }

    async fn list_for_resource(
        &self,
        resource_type: &str,
        resource_id: Uuid,
    ) -> Result<Vec<AuditLog>, DbError> {
        let rows: Vec<SqliteAuditRow> = sqlx::query_as(&format!(
            "{} WHERE resource_type = ? AND resource_id = ? ORDER BY created_at DESC",
            SELECT_AUDIT
        ))
        .bind(resource_type)
        .bind(resource_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

/// PostgreSQL implementation of AuditRepository.
#[cfg(feature = "database")]
pub struct PgAuditRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgAuditRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl AuditRepository for PgAuditRepository {
    async fn create(&self, entry: &AuditLog) -> Result<AuditLog, DbError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, user_id, action, resource_type, resource_id, previous_values, new_values, ip_address, user_agent, status, error_message, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(&entry.action)
        .bind(&entry.resource_type)
        .bind(entry.resource_id)
        .bind(&entry.previous_values)
        .bind(&entry.new_values)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(entry.status.as_str())
        .bind(&entry.error_message)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(entry.clone())
    }

    async fn list_for_resource(
        &self,
        resource_type: &str,
        resource_id: Uuid,
    ) -> Result<Vec<AuditLog>, DbError> {
        let rows: Vec<PgAuditRow> = sqlx::query_as(&format!(
            "{} WHERE resource_type = $1 AND resource_id = $2 ORDER BY created_at DESC",
            SELECT_AUDIT
        ))
        .bind(resource_type)
        .bind(resource_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_audit_repository(pool: &DbPool) -> Arc<dyn AuditRepository> {
    match pool {
        DbPool::Sqlite(pool) => Arc::new(SqliteAuditRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Arc::new(PgAuditRepository::new(pool.clone())),
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct SqliteAuditRow {
    id: String,
    user_id: String,
    action: String,
    resource_type: String,
    resource_id: String,
    previous_values: Option<String>,
    new_values: Option<String>,
    ip_address: String,
    user_agent: String,
    status: String,
    error_message: Option<String>,
    created_at: String,
}

#[cfg(feature = "database")]
impl TryFrom<SqliteAuditRow> for AuditLog {
    type Error = DbError;

    fn try_from(row: SqliteAuditRow) -> Result<Self, Self::Error> {
        Ok(AuditLog {
            id: parse_db_uuid(&row.id)?,
            user_id: parse_db_uuid(&row.user_id)?,
            action: row.action,
            resource_type: row.resource_type,
            resource_id: parse_db_uuid(&row.resource_id)?,
            previous_values: row
                .previous_values
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            new_values: row
                .new_values
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            status: parse_db_enum(&row.status, "audit status")?,
            error_message: row.error_message,
            created_at: parse_db_timestamp(&row.created_at)?,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgAuditRow {
    id: Uuid,
    user_id: Uuid,
    action: String,
    resource_type: String,
    resource_id: Uuid,
    previous_values: Option<serde_json::Value>,
    new_values: Option<serde_json::Value>,
    ip_address: String,
    user_agent: String,
    status: String,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
}

#[cfg(feature = "database")]
impl TryFrom<PgAuditRow> for AuditLog {
    type Error = DbError;

    fn try_from(row: PgAuditRow) -> Result<Self, Self::Error> {
        Ok(AuditLog {
            id: row.id,
            user_id: row.user_id,
            action: row.action,
            resource_type: row.resource_type,
            resource_id: row.resource_id,
            previous_values: row.previous_values,
            new_values: row.new_values,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            status: parse_db_enum(&row.status, "audit status")?,
            error_message: row.error_message,
            created_at: row.created_at,
        })
    }
}
