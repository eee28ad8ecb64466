//! Threat repository for database operations.

use super::DbError;
#[cfg(feature = "database")]
use super::{
    parse_db_enum, parse_db_timestamp, parse_db_uuid, parse_opt_db_timestamp, parse_opt_db_uuid,
    to_db_timestamp, DbPool,
};
use crate::incident::Severity;
use crate::threat::{Threat, ThreatStatus};
use async_trait::async_trait;
#[cfg(feature = "database")]
use chrono::{DateTime, Utc};
#[cfg(feature = "database")]
use std::sync::Arc;
use uuid::Uuid;

/// Filter criteria for listing threats.
#[derive(Debug, Clone, Default)]
pub struct ThreatFilter {
    pub status: Option<Vec<ThreatStatus>>,
    pub severity: Option<Vec<Severity>>,
}

impl ThreatFilter {
    pub fn with_status(status: ThreatStatus) -> Self {
        Self {
            status: Some(vec![status]),
            ..Default::default()
        }
    }

    pub fn matches(&self, threat: &Threat) -> bool {
        self.status
            .as_ref()
            .map_or(true, |s| s.contains(&threat.status))
            && self
                .severity
                .as_ref()
                .map_or(true, |s| s.contains(&threat.severity))
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

/// Repository trait for threat persistence.
#[async_trait]
pub trait ThreatRepository: Send + Sync {
    async fn create(&self, threat: &Threat) -> Result<Threat, DbError>;

    async fn get(&self, id: Uuid) -> Result<Option<Threat>, DbError>;

    /// Lists threats, most recently detected first.
    async fn list(&self, filter: &ThreatFilter) -> Result<Vec<Threat>, DbError>;

    async fn count(&self, filter: &ThreatFilter) -> Result<u64, DbError>;

    /// Replaces all mutable fields of an existing threat.
    async fn save(&self, threat: &Threat) -> Result<Threat, DbError>;
}

#[cfg(feature = "database")]
const SELECT_THREAT: &str = "SELECT id, classification, description, severity, status, detected_at, detection_source, investigated_at, investigated_by, investigation_notes, related_incidents, created_at, updated_at FROM threats";

/// SQLite implementation of ThreatRepository.
#[cfg(feature = "database")]
pub struct SqliteThreatRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteThreatRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    fn where_clause(filter: &ThreatFilter) -> String {
        let mut clause = String::from(" WHERE 1=1");
        if filter.status.is_some() {
            clause.push_str(" AND status IN (SELECT value FROM json_each(?))");
        }
        if filter.severity.is_some() {
            clause.push_str(" AND severity IN (SELECT value FROM json_each(?))");
        }
        clause
    }

    fn filter_params(filter: &ThreatFilter) -> Result<Vec<String>, DbError> {
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
impl ThreatRepository for SqliteThreatRepository {
    async fn create(&self, threat: &Threat) -> Result<Threat, DbError> {
        let related = serde_json::to_string(&threat.related_incidents)?;

        sqlx::query(
            r#"
            INSERT INTO threats (id, classification, description, severity, status, detected_at, detection_source, investigated_at, investigated_by, investigation_notes, related_incidents, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(threat.id.to_string())
        .bind(&threat.classification)
        .bind(&threat.description)
        .bind(threat.severity.as_str())
        .bind(threat.status.as_str())
        .bind(to_db_timestamp(&threat.detected_at))
        .bind(&threat.detection_source)
        .bind(threat.investigated_at.as_ref().map(to_db_timestamp))
        .bind(threat.investigated_by.map(|id| id.to_string()))
        .bind(&threat.investigation_notes)
        .bind(&related)
        .bind(to_db_timestamp(&threat.created_at))
        .bind(to_db_timestamp(&threat.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(threat.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Threat>, DbError> {
        let row: Option<SqliteThreatRow> =
            sqlx::query_as(&format!("{} WHERE id = ?", SELECT_THREAT))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self, filter: &ThreatFilter) -> Result<Vec<Threat>, DbError> {
        let query = format!(
            "{}{} ORDER BY detected_at DESC",
            SELECT_THREAT,
            Self::where_clause(filter)
        );

        let mut query_builder = sqlx::query_as::<_, SqliteThreatRow>(&query);
        for param in Self::filter_params(filter)? {
            query_builder = query_builder.bind(param);
        }

        let rows: Vec<SqliteThreatRow> = query_builder.fetch_all(&self.pool).await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn count(&self, filter: &ThreatFilter) -> Result<u64, DbError> {
        let query = format!("SELECT COUNT(*) FROM threats{}", Self::where_clause(filter));

        let mut query_builder = sqlx::query_scalar::<_, i64>(&query);
        for param in Self::filter_params(filter)? {
            query_builder = query_builder.bind(param);
        }

        let count = query_builder.fetch_one(&self.pool).await?;
        Ok(count as u64)
    }

    async fn save(&self, threat: &Threat) -> Result<Threat, DbError> {
        let related = serde_json::to_string(&threat.related_incidents)?;

        let result = sqlx::query(
            r#"
            UPDATE threats SET
                classification = ?, description = ?, severity = ?, status = ?,
                investigated_at = ?, investigated_by = ?, investigation_notes = ?,
                related_incidents = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&threat.classification)
        .bind(&threat.description)
        .bind(threat.severity.as_str())
        .bind(threat.status.as_str())
        .bind(threat.investigated_at.as_ref().map(to_db_timestamp))
        .bind(threat.investigated_by.map(|id| id.to_string()))
        .bind(&threat.investigation_notes)
        .bind(&related)
        .bind(to_db_timestamp(&threat.updated_at))
        .bind(threat.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Threat", threat.id));
        }

        Ok(threat.clone())
    }
}

/// PostgreSQL implementation of ThreatRepository.
#[cfg(feature = "database")]
pub struct PgThreatRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgThreatRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl ThreatRepository for PgThreatRepository {
    async fn create(&self, threat: &Threat) -> Result<Threat, DbError> {
        sqlx::query(
            r#"
            INSERT INTO threats (id, classification, description, severity, status, detected_at, detection_source, investigated_at, investigated_by, investigation_notes, related_incidents, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(threat.id)
        .bind(&threat.classification)
        .bind(&threat.description)
        .bind(threat.severity.as_str())
        .bind(threat.status.as_str())
        .bind(threat.detected_at)
        .bind(&threat.detection_source)
        .bind(threat.investigated_at)
        .bind(threat.investigated_by)
        .bind(&threat.investigation_notes)
        .bind(serde_json::to_value(&threat.related_incidents)?)
        .bind(threat.created_at)
        .bind(threat.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(threat.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Threat>, DbError> {
        let row: Option<PgThreatRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_THREAT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self, filter: &ThreatFilter) -> Result<Vec<Threat>, DbError> {
        let rows: Vec<PgThreatRow> = sqlx::query_as(&format!(
            r#"{}
            WHERE ($1::text[] IS NULL OR status = ANY($1))
              AND ($2::text[] IS NULL OR severity = ANY($2))
            ORDER BY detected_at DESC"#,
            SELECT_THREAT
        ))
        .bind(filter.status_strs())
        .bind(filter.severity_strs())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn count(&self, filter: &ThreatFilter) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM threats
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

    async fn save(&self, threat: &Threat) -> Result<Threat, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE threats SET
                classification = $2, description = $3, severity = $4, status = $5,
                investigated_at = $6, investigated_by = $7, investigation_notes = $8,
                related_incidents = $9, updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(threat.id)
        .bind(&threat.classification)
        .bind(&threat.description)
        .bind(threat.severity.as_str())
        .bind(threat.status.as_str())
        .bind(threat.investigated_at)
        .bind(threat.investigated_by)
        .bind(&threat.investigation_notes)
        .bind(serde_json::to_value(&threat.related_incidents)?)
        .bind(threat.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Threat", threat.id));
        }

        Ok(threat.clone())
    }
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_threat_repository(pool: &DbPool) -> Arc<dyn ThreatRepository> {
    match pool {
        DbPool::Sqlite(pool) => Arc::new(SqliteThreatRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Arc::new(PgThreatRepository::new(pool.clone())),
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct SqliteThreatRow {
    id: String,
    classification: String,
    description: String,
    severity: String,
    status: String,
    detected_at: String,
    detection_source: String,
    investigated_at: Option<String>,
    investigated_by: Option<String>,
    investigation_notes: Option<String>,
    related_incidents: String,
    created_at: String,
    updated_at: String,
}

#[cfg(feature = "database")]
impl TryFrom<SqliteThreatRow> for Threat {
    type Error = DbError;

    fn try_from(row: SqliteThreatRow) -> Result<Self, Self::Error> {
        Ok(Threat {
            id: parse_db_uuid(&row.id)?,
            classification: row.classification,
            description: row.description,
            severity: parse_db_enum(&row.severity, "severity")?,
            status: parse_db_enum(&row.status, "threat status")?,
            detected_at: parse_db_timestamp(&row.detected_at)?,
            detection_source: row.detection_source,
            investigated_at: parse_opt_db_timestamp(row.investigated_at)?,
            investigated_by: parse_opt_db_uuid(row.investigated_by)?,
            investigation_notes: row.investigation_notes,
            related_incidents: serde_json::from_str(&row.related_incidents)?,
            created_at: parse_db_timestamp(&row.created_at)?,
            updated_at: parse_db_timestamp(&row.updated_at)?,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgThreatRow {
    id: Uuid,
    classification: String,
    description: String,
    severity: String,
    status: String,
    detected_at: DateTime<Utc>,
    detection_source: String,
    investigated_at: Option<DateTime<Utc>>,
    investigated_by: Option<Uuid>,
    investigation_notes: Option<String>,
    related_incidents: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[cfg(feature = "database")]
impl TryFrom<PgThreatRow> for Threat {
    type Error = DbError;

    fn try_from(row: PgThreatRow) -> Result<Self, Self::Error> {
        Ok(Threat {
            id: row.id,
            classification: row.classification,
            description: row.description,
            severity: parse_db_enum(&row.severity, "severity")?,
            status: parse_db_enum(&row.status, "threat status")?,
            detected_at: row.detected_at,
            detection_source: row.detection_source,
            investigated_at: row.investigated_at,
            investigated_by: row.investigated_by,
            investigation_notes: row.investigation_notes,
            related_incidents: serde_json::from_value(row.related_incidents)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
