//! Alert repository for database operations.

use super::DbError;
#[cfg(feature = "database")]
use super::{
    parse_db_enum, parse_db_timestamp, parse_db_uuid, parse_opt_db_timestamp, parse_opt_db_uuid,
    to_db_timestamp, DbPool,
};
use crate::alert::{Alert, AlertReceipt};
use async_trait::async_trait;
#[cfg(feature = "database")]
use chrono::{DateTime, Utc};
#[cfg(feature = "database")]
use std::sync::Arc;
use uuid::Uuid;

/// Filter criteria for listing alerts.
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    /// Restricts results to alerts addressed to this user or broadcast.
    pub visible_to: Option<Uuid>,
    pub unread_only: bool,
    pub include_archived: bool,
    pub limit: Option<u32>,
}

impl AlertFilter {
    /// Non-archived alerts visible to `user_id`.
    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            visible_to: Some(user_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, alert: &Alert) -> bool {
        self.visible_to.map_or(true, |user| alert.is_visible_to(user))
            && (!self.unread_only || !alert.is_read)
            && (self.include_archived || !alert.is_archived)
    }
}

/// Repository trait for alert persistence.
#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn create(&self, alert: &Alert) -> Result<Alert, DbError>;

    async fn get(&self, id: Uuid) -> Result<Option<Alert>, DbError>;

    /// Fetches an alert visible to `user_id`, with broadcast flags taken from
    /// that user's receipt.
    async fn get_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Alert>, DbError>;

    /// Lists alerts, newest first. With `visible_to` set, broadcast flags are
    /// that user's own.
    async fn list(&self, filter: &AlertFilter) -> Result<Vec<Alert>, DbError>;

    /// Persists read and archive state of an addressed alert.
    async fn save(&self, alert: &Alert) -> Result<Alert, DbError>;

    /// Inserts or replaces one user's receipt for a broadcast alert.
    async fn save_receipt(&self, receipt: &AlertReceipt) -> Result<(), DbError>;
}

#[cfg(feature = "database")]
const SELECT_ALERT: &str = "SELECT id, alert_type, title, message, severity, recipient_id, related_resource_id, is_read, is_archived, created_at, read_at, archived_at FROM alerts";

/// Alerts as seen by the user bound to `?1` (NULL for everyone's raw rows).
#[cfg(feature = "database")]
const SQLITE_INBOX: &str = r#"
    SELECT a.id, a.alert_type, a.title, a.message, a.severity, a.recipient_id, a.related_resource_id,
           CASE WHEN a.recipient_id IS NULL THEN r.read_at IS NOT NULL ELSE a.is_read END AS is_read,
           CASE WHEN a.recipient_id IS NULL THEN r.archived_at IS NOT NULL ELSE a.is_archived END AS is_archived,
           a.created_at,
           CASE WHEN a.recipient_id IS NULL THEN r.read_at ELSE a.read_at END AS read_at,
           CASE WHEN a.recipient_id IS NULL THEN r.archived_at ELSE a.archived_at END AS archived_at
    FROM alerts a
    LEFT JOIN alert_receipts r ON r.alert_id = a.id AND r.user_id = ?1
    WHERE ?1 IS NULL OR a.recipient_id IS NULL OR a.recipient_id = ?1
"#;

/// Alerts as seen by the user bound to `$1`.
#[cfg(feature = "database")]
const PG_INBOX: &str = r#"
    SELECT a.id, a.alert_type, a.title, a.message, a.severity, a.recipient_id, a.related_resource_id,
           CASE WHEN a.recipient_id IS NULL THEN r.read_at IS NOT NULL ELSE a.is_read END AS is_read,
           CASE WHEN a.recipient_id IS NULL THEN r.archived_at IS NOT NULL ELSE a.is_archived END AS is_archived,
           a.created_at,
           CASE WHEN a.recipient_id IS NULL THEN r.read_at ELSE a.read_at END AS read_at,
           CASE WHEN a.recipient_id IS NULL THEN r.archived_at ELSE a.archived_at END AS archived_at
    FROM alerts a
    LEFT JOIN alert_receipts r ON r.alert_id = a.id AND r.user_id = $1
    WHERE $1::uuid IS NULL OR a.recipient_id IS NULL OR a.recipient_id = $1
"#;

/// SQLite implementation of AlertRepository.
#[cfg(feature = "database")]
pub struct SqliteAlertRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteAlertRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl AlertRepository for SqliteAlertRepository {
    async fn create(&self, alert: &Alert) -> Result<Alert, DbError> {
        sqlx::query(
            r#"
            INSERT INTO alerts (id, alert_type, title, message, severity, recipient_id, related_resource_id, is_read, is_archived, created_at, read_at, archived_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(alert.id.to_string())
        .bind(alert.alert_type.as_str())
        .bind(&alert.title)
        .bind(&alert.message)
        .bind(alert.severity.as_str())
        .bind(alert.recipient_id.map(|id| id.to_string()))
        .bind(alert.related_resource_id.to_string())
        .bind(alert.is_read)
        .bind(alert.is_archived)
        .bind(to_db_timestamp(&alert.created_at))
        .bind(alert.read_at.as_ref().map(to_db_timestamp))
        .bind(alert.archived_at.as_ref().map(to_db_timestamp))
        .execute(&self.pool)
        .await?;

        Ok(alert.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Alert>, DbError> {
        let row: Option<SqliteAlertRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_ALERT))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Alert>, DbError> {
        let row: Option<SqliteAlertRow> =
            sqlx::query_as(&format!("SELECT * FROM ({}) inbox WHERE id = ?2", SQLITE_INBOX))
                .bind(user_id.to_string())
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self, filter: &AlertFilter) -> Result<Vec<Alert>, DbError> {
        let mut query = format!("SELECT * FROM ({}) inbox WHERE 1=1", SQLITE_INBOX);

        if filter.unread_only {
            query.push_str(" AND is_read = 0");
        }
        if !filter.include_archived {
            query.push_str(" AND is_archived = 0");
        }
        query.push_str(" ORDER BY created_at DESC");
        if filter.limit.is_some() {
            query.push_str(" LIMIT ?2");
        }

        let mut query_builder = sqlx::query_as::<_, SqliteAlertRow>(&query)
            .bind(filter.visible_to.map(|user| user.to_string()));
        if let Some(limit) = filter.limit {
            query_builder = query_builder.bind(limit as i64);
        }

        let rows: Vec<SqliteAlertRow> = query_builder.fetch_all(&self.pool).await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn save(&self, alert: &Alert) -> Result<Alert, DbError> {
        let result = sqlx::query(
            "UPDATE alerts SET is_read = ?, is_archived = ?, read_at = ?, archived_at = ? WHERE id = ?",
        )
        .bind(alert.is_read)
        .bind(alert.is_archived)
        .bind(alert.read_at.as_ref().map(to_db_timestamp))
        .bind(alert.archived_at.as_ref().map(to_db_timestamp))
        .bind(alert.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Alert", alert.id));
        }

        Ok(alert.clone())
    }
    async fn save_receipt(&self, receipt: &AlertReceipt) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO alert_receipts (alert_id, user_id, read_at, archived_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (alert_id, user_id)
            DO UPDATE SET read_at = excluded.read_at, archived_at = excluded.archived_at
            "#,
        )
        .bind(receipt.alert_id.to_string())
        .bind(receipt.user_id.to_string())
        .bind(receipt.read_at.as_ref().map(to_db_timestamp))
        .bind(receipt.archived_at.as_ref().map(to_db_timestamp))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// PostgreSQL implementation of AlertRepository.
#[cfg(feature = "database")]
pub struct PgAlertRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgAlertRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl AlertRepository for PgAlertRepository {
    async fn create(&self, alert: &Alert) -> Result<Alert, DbError> {
        sqlx::query(
            r#"
            INSERT INTO alerts (id, alert_type, title, message, severity, recipient_id, related_resource_id, is_read, is_archived, created_at, read_at, archived_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(alert.id)
        .bind(alert.alert_type.as_str())
        .bind(&alert.title)
        .bind(&alert.message)
        .bind(alert.severity.as_str())
        .bind(alert.recipient_id)
        .bind(alert.related_resource_id)
        .bind(alert.is_read)
        .bind(alert.is_archived)
        .bind(alert.created_at)
        .bind(alert.read_at)
        .bind(alert.archived_at)
        .execute(&self.pool)
        .await?;

        Ok(alert.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Alert>, DbError> {
        let row: Option<PgAlertRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_ALERT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Alert>, DbError> {
        let row: Option<PgAlertRow> =
            sqlx::query_as(&format!("SELECT * FROM ({}) inbox WHERE id = $2", PG_INBOX))
                .bind(user_id)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self, filter: &AlertFilter) -> Result<Vec<Alert>, DbError> {
        let rows: Vec<PgAlertRow> = sqlx::query_as(&format!(
            r#"SELECT * FROM ({}) inbox
            WHERE (NOT $2 OR is_read = FALSE)
              AND ($3 OR is_archived = FALSE)
            ORDER BY created_at DESC
            LIMIT $4"#,
            PG_INBOX
        ))
        .bind(filter.visible_to)
        .bind(filter.unread_only)
        .bind(filter.include_archived)
        .bind(filter.limit.map(|l| l as i64))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn save(&self, alert: &Alert) -> Result<Alert, DbError> {
        let result = sqlx::query(
            "UPDATE alerts SET is_read = $2, is_archived = $3, read_at = $4, archived_at = $5 WHERE id = $1",
        )
        .bind(alert.id)
        .bind(alert.is_read)
        .bind(alert.is_archived)
        .bind(alert.read_at)
        .bind(alert.archived_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Alert", alert.id));
        }

        Ok(alert.clone())
    }
    async fn save_receipt(&self, receipt: &AlertReceipt) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO alert_receipts (alert_id, user_id, read_at, archived_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (alert_id, user_id)
            DO UPDATE SET read_at = EXCLUDED.read_at, archived_at = EXCLUDED.archived_at
            "#,
        )
        .bind(receipt.alert_id)
        .bind(receipt.user_id)
        .bind(receipt.read_at)
        .bind(receipt.archived_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_alert_repository(pool: &DbPool) -> Arc<dyn AlertRepository> {
    match pool {
        DbPool::Sqlite(pool) => Arc::new(SqliteAlertRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Arc::new(PgAlertRepository::new(pool.clone())),
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct SqliteAlertRow {
    id: String,
    alert_type: String,
    title: String,
    message: String,
    severity: String,
    recipient_id: Option<String>,
    related_resource_id: String,
    is_read: bool,
    is_archived: bool,
    created_at: String,
    read_at: Option<String>,
    archived_at: Option<String>,
}

#[cfg(feature = "database")]
impl TryFrom<SqliteAlertRow> for Alert {
    type Error = DbError;

    fn try_from(row: SqliteAlertRow) -> Result<Self, Self::Error> {
        Ok(Alert {
            id: parse_db_uuid(&row.id)?,
            alert_type: parse_db_enum(&row.alert_type, "alert type")?,
            title: row.title,
            message: row.message,
            severity: parse_db_enum(&row.severity, "severity")?,
            recipient_id: parse_opt_db_uuid(row.recipient_id)?,
            related_resource_id: parse_db_uuid(&row.related_resource_id)?,
            is_read: row.is_read,
            is_archived: row.is_archived,
            created_at: parse_db_timestamp(&row.created_at)?,
            read_at: parse_opt_db_timestamp(row.read_at)?,
            archived_at: parse_opt_db_timestamp(row.archived_at)?,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgAlertRow {
    id: Uuid,
    alert_type: String,
    title: String,
    message: String,
    severity: String,
    recipient_id: Option<Uuid>,
    related_resource_id: Uuid,
    is_read: bool,
    is_archived: bool,
    created_at: DateTime<Utc>,
    read_at: Option<DateTime<Utc>>,
    archived_at: Option<DateTime<Utc>>,
}

#[cfg(feature = "database")]
impl TryFrom<PgAlertRow> for Alert {
    type Error = DbError;

    fn try_from(row: PgAlertRow) -> Result<Self, Self::Error> {
        Ok(Alert {
            id: row.id,
            alert_type: parse_db_enum(&row.alert_type, "alert type")?,
            title: row.title,
            message: row.message,
            severity: parse_db_enum(&row.severity, "severity")?,
            recipient_id: row.recipient_id,
            related_resource_id: row.related_resource_id,
            is_read: row.is_read,
            is_archived: row.is_archived,
            created_at: row.created_at,
            read_at: row.read_at,
            archived_at: row.archived_at,
        })
    }
}
