//! Incident repository for database operations.

use super::pagination::Pagination;
use super::DbError;
#[cfg(feature = "database")]
use super::{
    parse_db_enum, parse_db_timestamp, parse_db_uuid, parse_opt_db_timestamp, parse_opt_db_uuid,
    to_db_timestamp, DbPool,
};
use crate::incident::{Incident, IncidentStatus, Severity};
use async_trait::async_trait;
#[cfg(feature = "database")]
use chrono::{DateTime, Utc};
#[cfg(feature = "database")]
use std::sync::Arc;
use uuid::Uuid;

/// Filter criteria for listing incidents.
#[derive(Debug, Clone, Default)]
pub struct IncidentFilter {
    /// Filter by status (multiple allowed).
    pub status: Option<Vec<IncidentStatus>>,
    /// Filter by severity (multiple allowed).
    pub severity: Option<Vec<Severity>>,
}

impl IncidentFilter {
    pub fn with_status(status: IncidentStatus) -> Self {
        Self {
            status: Some(vec![status]),
            ..Default::default()
        }
    }

    pub fn with_severity(severity: Severity) -> Self {
        Self {
            severity: Some(vec![severity]),
            ..Default::default()
        }
    }

    /// Returns true if the incident passes every populated criterion.
    pub fn matches(&self, incident: &Incident) -> bool {
        let status_ok = self
            .status
            .as_ref()
            .map_or(true, |s| s.contains(&incident.status));
        let severity_ok = self
            .severity
            .as_ref()
            .map_or(true, |s| s.contains(&incident.severity));
        status_ok && severity_ok
    }

    #[cfg(feature = "database")]
    fn status_strs(&self) -> Option<Vec<&'static str>> {
        self.status
            .as_ref()
            .map(|s| s.iter().map(|st| st.as_str()).collect())
    }

    #[cfg(feature = "database")]
    fn severity_strs(&self) -> Option<Vec<&'static str>> {
        self.severity
            .as_ref()
            .map(|s| s.iter().map(|sv| sv.as_str()).collect())
    }
}

/// Repository trait for incident persistence.
#[async_trait]
pub trait IncidentRepository: Send + Sync {
    /// Creates a new incident.
    async fn create(&self, incident: &Incident) -> Result<Incident, DbError>;

    /// Gets an incident by ID.
    async fn get(&self, id: Uuid) -> Result<Option<Incident>, DbError>;

    /// Lists incidents, newest first.
    async fn list(
        &self,
        filter: &IncidentFilter,
        pagination: &Pagination,
    ) -> Result<Vec<Incident>, DbError>;

    /// Counts incidents matching the filter.
    async fn count(&self, filter: &IncidentFilter) -> Result<u64, DbError>;

    /// Replaces all mutable fields of an existing incident.
    async fn save(&self, incident: &Incident) -> Result<Incident, DbError>;

    /// Deletes an incident. Returns false if it did not exist.
    async fn delete(&self, id: Uuid) -> Result<bool, DbError>;
}

#[cfg(feature = "database")]
const SELECT_INCIDENT: &str = "SELECT id, title, description, severity, status, incident_type, created_by, assigned_to, tags, created_at, updated_at, resolved_at, closed_at FROM incidents";

/// SQLite implementation of IncidentRepository.
#[cfg(feature = "database")]
pub struct SqliteIncidentRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteIncidentRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    fn where_clause(filter: &IncidentFilter) -> String {
        let mut clause = String::from(" WHERE 1=1");
        if filter.status.is_some() {
            clause.push_str(" AND status IN (SELECT value FROM json_each(?))");
        }
        if filter.severity.is_some() {
            clause.push_str(" AND severity IN (SELECT value FROM json_each(?))");
        }
        clause
    }

    fn filter_params(filter: &IncidentFilter) -> Result<Vec<String>, DbError> {
        let mut params = Vec::new();
        if let Some(statuses) = filter.status_strs() {
            params.push(serde_json::to_string(&statuses)?);
        }
        if let Some(severities) = filter.severity_strs() {
            params.push(serde_json::to_string(&severities)?);
        }
        Ok(params)
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl IncidentRepository for SqliteIncidentRepository {
    async fn create(&self, incident: &Incident) -> Result<Incident, DbError> {
        let tags = serde_json::to_string(&incident.tags)?;

        sqlx::query(
            r#"
            INSERT INTO incidents (id, title, description, severity, status, incident_type, created_by, assigned_to, tags, created_at, updated_at, resolved_at, closed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(incident.id.to_string())
        .bind(&incident.title)
        .bind(&incident.description)
        .bind(incident.severity.as_str())
        .bind(incident.status.as_str())
        .bind(&incident.incident_type)
        .bind(incident.created_by.to_string())
        .bind(incident.assigned_to.map(|id| id.to_string()))
        .bind(&tags)
        .bind(to_db_timestamp(&incident.created_at))
        .bind(to_db_timestamp(&incident.updated_at))
        .bind(incident.resolved_at.as_ref().map(to_db_timestamp))
        .bind(incident.closed_at.as_ref().map(to_db_timestamp))
        .execute(&self.pool)
        .await?;

        Ok(incident.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Incident>, DbError> {
        let row: Option<SqliteIncidentRow> =
            sqlx::query_as(&format!("{} WHERE id = ?", SELECT_INCIDENT))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(
        &self,
        filter: &IncidentFilter,
        pagination: &Pagination,
    ) -> Result<Vec<Incident>, DbError> {
        let query = format!(
            "{}{} ORDER BY created_at DESC LIMIT ? OFFSET ?",
            SELECT_INCIDENT,
            Self::where_clause(filter)
        );

        let mut query_builder = sqlx::query_as::<_, SqliteIncidentRow>(&query);
        for param in Self::filter_params(filter)? {
            query_builder = query_builder.bind(param);
        }
        query_builder = query_builder
            .bind(pagination.limit() as i64)
            .bind(pagination.offset() as i64);

        let rows: Vec<SqliteIncidentRow> = query_builder.fetch_all(&self.pool).await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn count(&self, filter: &IncidentFilter) -> Result<u64, DbError> {
        let query = format!(
            "SELECT COUNT(*) FROM incidents{}",
            Self::where_clause(filter)
        );

        let mut query_builder = sqlx::query_scalar::<_, i64>(&query);
        for param in Self::filter_params(filter)? {
            query_builder = query_builder.bind(param);
        }

        let count = query_builder.fetch_one(&self.pool).await?;
        Ok(count as u64)
    }

    async fn save(&self, incident: &Incident) -> Result<Incident, DbError> {
        let tags = serde_json::to_string(&incident.tags)?;

        let result = sqlx::query(
            r#"
            UPDATE incidents SET
                title = ?, description = ?, severity = ?, status = ?, incident_type = ?,
                assigned_to = ?, tags = ?, updated_at = ?, resolved_at = ?, closed_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&incident.title)
        .bind(&incident.description)
        .bind(incident.severity.as_str())
        .bind(incident.status.as_str())
        .bind(&incident.incident_type)
        .bind(incident.assigned_to.map(|id| id.to_string()))
        .bind(&tags)
        .bind(to_db_timestamp(&incident.updated_at))
        .bind(incident.resolved_at.as_ref().map(to_db_timestamp))
        .bind(incident.closed_at.as_ref().map(to_db_timestamp))
        .bind(incident.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Incident", incident.id));
        }

        Ok(incident.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM incidents WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// PostgreSQL implementation of IncidentRepository.
#[cfg(feature = "database")]
pub struct PgIncidentRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgIncidentRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl IncidentRepository for PgIncidentRepository {
    async fn create(&self, incident: &Incident) -> Result<Incident, DbError> {
        sqlx::query(
            r#"
            INSERT INTO incidents (id, title, description, severity, status, incident_type, created_by, assigned_to, tags, created_at, updated_at, resolved_at, closed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(incident.id)
        .bind(&incident.title)
        .bind(&incident.description)
        .bind(incident.severity.as_str())
        .bind(incident.status.as_str())
        .bind(&incident.incident_type)
        .bind(incident.created_by)
        .bind(incident.assigned_to)
        .bind(serde_json::to_value(&incident.tags)?)
        .bind(incident.created_at)
        .bind(incident.updated_at)
        .bind(incident.resolved_at)
        .bind(incident.closed_at)
        .execute(&self.pool)
        .await?;

        Ok(incident.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Incident>, DbError> {
        let row: Option<PgIncidentRow> =
            sqlx::query_as(&format!("{} WHERE id = $1", SELECT_INCIDENT))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(
        &self,
        filter: &IncidentFilter,
        pagination: &Pagination,
    ) -> Result<Vec<Incident>, DbError> {
        let rows: Vec<PgIncidentRow> = sqlx::query_as(&format!(
            r#"{}
            WHERE ($1::text[] IS NULL OR status = ANY($1))
              AND ($2::text[] IS NULL OR severity = ANY($2))
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4"#,
            SELECT_INCIDENT
        ))
        .bind(filter.status_strs())
        .bind(filter.severity_strs())
        .bind(pagination.limit() as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn count(&self, filter: &IncidentFilter) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM incidents
            WHERE ($1::text[] IS NULL OR status = ANY($1))
              AND ($2::text[] IS NULL OR severity = ANY($2))
            "#,
        )
        .bind(filter.status_strs())
        .bind(filter.severity_strs())
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u64)
    }

    async fn save(&self, incident: &Incident) -> Result<Incident, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE incidents SET
                title = $2, description = $3, severity = $4, status = $5, incident_type = $6,
                assigned_to = $7, tags = $8, updated_at = $9, resolved_at = $10, closed_at = $11
            WHERE id = $1
            "#,
        )
        .bind(incident.id)
        .bind(&incident.title)
        .bind(&incident.description)
        .bind(incident.severity.as_str())
        .bind(incident.status.as_str())
        .bind(&incident.incident_type)
        .bind(incident.assigned_to)
        .bind(serde_json::to_value(&incident.tags)?)
        .bind(incident.updated_at)
        .bind(incident.resolved_at)
        .bind(incident.closed_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Incident", incident.id));
        }

        Ok(incident.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM incidents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_incident_repository(pool: &DbPool) -> Arc<dyn IncidentRepository> {
    match pool {
        DbPool::Sqlite(pool) => Arc::new(SqliteIncidentRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Arc::new(PgIncidentRepository::new(pool.clone())),
    }
}

// Helper structs for SQLx row mapping

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct SqliteIncidentRow {
    id: String,
    title: String,
    description: String,
    severity: String,
    status: String,
    incident_type: String,
    created_by: String,
    assigned_to: Option<String>,
    tags: String,
    created_at: String,
    updated_at: String,
    resolved_at: Option<String>,
    closed_at: Option<String>,
}

#[cfg(feature = "database")]
impl TryFrom<SqliteIncidentRow> for Incident {
    type Error = DbError;

    fn try_from(row: SqliteIncidentRow) -> Result<Self, Self::Error> {
        Ok(Incident {
            id: parse_db_uuid(&row.id)?,
            title: row.title,
            description: row.description,
            severity: parse_db_enum(&row.severity, "severity")?,
            status: parse_db_enum(&row.status, "incident status")?,
            incident_type: row.incident_type,
            created_by: parse_db_uuid(&row.created_by)?,
            assigned_to: parse_opt_db_uuid(row.assigned_to)?,
            tags: serde_json::from_str(&row.tags)?,
            created_at: parse_db_timestamp(&row.created_at)?,
            updated_at: parse_db_timestamp(&row.updated_at)?,
            resolved_at: parse_opt_db_timestamp(row.resolved_at)?,
            closed_at: parse_opt_db_timestamp(row.closed_at)?,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgIncidentRow {
    id: Uuid,
    title: String,
    description: String,
    severity: String,
    status: String,
    incident_type: String,
    created_by: Uuid,
    assigned_to: Option<Uuid>,
    tags: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
}

#[cfg(feature = "database")]
impl TryFrom<PgIncidentRow> for Incident {
    type Error = DbError;

    fn try_from(row: PgIncidentRow) -> Result<Self, Self::Error> {
        Ok(Incident {
            id: row.id,
            title: row.title,
            description: row.description,
            severity: parse_db_enum(&row.severity, "severity")?,
            status: parse_db_enum(&row.status, "incident status")?,
            incident_type: row.incident_type,
            created_by: row.created_by,
            assigned_to: row.assigned_to,
            tags: serde_json::from_value(row.tags)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            resolved_at: row.resolved_at,
            closed_at: row.closed_at,
        })
    }
}
