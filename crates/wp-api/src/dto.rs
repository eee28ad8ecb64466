//! Data Transfer Objects (DTOs) for API requests and responses.
//!
//! All payloads use camelCase field names on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use wp_core::auth::UserSummary;
use wp_core::db::PaginatedResult;
use wp_core::services::{
    DashboardMetrics, IncidentDetail, LoginResponse, SeverityCounts, StatusCounts, ThreatDetail,
};
use wp_core::{
    Alert, AuditLog, Incident, IncidentPatch, IncidentStatus, LogEntry, NewIncident, NewThreat,
    Severity, ThreatAssessment,
};

use crate::error::ApiError;

/// Parses an optional enum field, reporting failures against `field`.
fn parse_field<T: FromStr<Err = String>>(
    field: &str,
    value: Option<&str>,
) -> Result<Option<T>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => T::from_str(raw)
            .map(Some)
            .map_err(|e| ApiError::validation_field(field, "invalid", &e)),
        None => Ok(None),
    }
}

/// Parses a comma-separated filter such as `Open,in_progress`.
pub fn parse_list<T: FromStr<Err = String>>(
    field: &str,
    value: Option<&str>,
) -> Result<Option<Vec<T>>, ApiError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let parsed = raw
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| T::from_str(v).map_err(|e| ApiError::validation_field(field, "invalid", &e)))
        .collect::<Result<Vec<T>, ApiError>>()?;
    Ok(if parsed.is_empty() { None } else { Some(parsed) })
}

/// Distinguishes an explicit `null` from an absent field.
fn deserialize_present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

// ============================================================================
// Common DTOs
// ============================================================================

/// Simple message response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Public view of a user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
}

impl From<UserSummary> for UserResponse {
    fn from(user: UserSummary) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role.to_string(),
        }
    }
}

// ============================================================================
// Auth DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(max = 254))]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 1024))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(max = 254))]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 1024))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponseDto {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserResponse,
}

impl From<LoginResponse> for LoginResponseDto {
    fn from(login: LoginResponse) -> Self {
        Self {
            token: login.token,
            expires_at: login.expires_at,
            user: login.user.into(),
        }
    }
}

// ============================================================================
// Incident DTOs
// ============================================================================

/// Query parameters for listing incidents.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ListIncidentsQuery {
    /// Comma-separated statuses, e.g. `Open,In Progress`.
    #[validate(length(max = 200))]
    pub status: Option<String>,
    /// Comma-separated severities.
    #[validate(length(max = 200))]
    pub severity: Option<String>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Items per page, clamped to 1..=100.
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateIncidentRequest {
    #[serde(default)]
    #[validate(length(max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 10000))]
    pub description: String,
    /// When omitted, severity is scored from the description.
    pub severity: Option<String>,
    #[serde(default, rename = "type")]
    #[validate(length(max = 100))]
    pub incident_type: String,
    pub assigned_to: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreateIncidentRequest {
    pub fn into_new_incident(self) -> Result<NewIncident, ApiError> {
        Ok(NewIncident {
            severity: parse_field::<Severity>("severity", self.severity.as_deref())?,
            title: self.title,
            description: self.description,
            incident_type: self.incident_type,
            assigned_to: self.assigned_to,
            tags: self.tags,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIncidentRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 10000))]
    pub description: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 100))]
    pub incident_type: Option<String>,
    /// `null` clears the assignee; omitting the field leaves it unchanged.
    #[serde(default, deserialize_with = "deserialize_present")]
    #[schema(value_type = Option<Uuid>)]
    pub assigned_to: Option<Option<Uuid>>,
    pub tags: Option<Vec<String>>,
}

impl UpdateIncidentRequest {
    pub fn into_patch(self) -> Result<IncidentPatch, ApiError> {
        Ok(IncidentPatch {
            severity: parse_field::<Severity>("severity", self.severity.as_deref())?,
            status: parse_field::<IncidentStatus>("status", self.status.as_deref())?,
            title: self.title,
            description: self.description,
            incident_type: self.incident_type,
            assigned_to: self.assigned_to,
            tags: self.tags,
        })
    }
}

/// Incident with creator and assignee summaries.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IncidentResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub severity: String,
    pub status: String,
    #[serde(rename = "type")]
    pub incident_type: String,
    pub created_by: Option<UserResponse>,
    pub assigned_to: Option<UserResponse>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl From<IncidentDetail> for IncidentResponse {
    fn from(detail: IncidentDetail) -> Self {
        let incident = detail.incident;
        Self {
            id: incident.id,
            title: incident.title,
            description: incident.description,
            severity: incident.severity.to_string(),
            status: incident.status.to_string(),
            incident_type: incident.incident_type,
            created_by: detail.created_by.map(Into::into),
            assigned_to: detail.assigned_to.map(Into::into),
            tags: incident.tags,
            created_at: incident.created_at,
            updated_at: incident.updated_at,
            resolved_at: incident.resolved_at,
            closed_at: incident.closed_at,
        }
    }
}

/// One page of incidents.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IncidentListResponse {
    pub incidents: Vec<IncidentResponse>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl From<PaginatedResult<IncidentDetail>> for IncidentListResponse {
    fn from(page: PaginatedResult<IncidentDetail>) -> Self {
        Self {
            total: page.total,
            page: page.page,
            limit: page.per_page,
            total_pages: page.total_pages,
            incidents: page.items.into_iter().map(Into::into).collect(),
        }
    }
}

/// Incident as embedded in other resources.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IncidentSummaryResponse {
    pub id: Uuid,
    pub title: String,
    pub severity: String,
    pub status: String,
}

impl From<Incident> for IncidentSummaryResponse {
    fn from(incident: Incident) -> Self {
        Self {
            id: incident.id,
            title: incident.title,
            severity: incident.severity.to_string(),
            status: incident.status.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ScoreRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 10000))]
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ThreatAssessmentResponse {
    pub severity: String,
    pub confidence: String,
    pub rationale: String,
}

impl From<ThreatAssessment> for ThreatAssessmentResponse {
    fn from(assessment: ThreatAssessment) -> Self {
        let confidence = serde_json::to_value(assessment.confidence)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default();
        Self {
            severity: assessment.severity.to_string(),
            confidence,
            rationale: assessment.rationale,
        }
    }
}

/// Audit trail entry.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Uuid,
    pub previous_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub ip_address: String,
    pub user_agent: String,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AuditLog> for AuditLogResponse {
    fn from(entry: AuditLog) -> Self {
        Self {
            id: entry.id,
            user_id: entry.user_id,
            action: entry.action,
            resource_type: entry.resource_type,
            resource_id: entry.resource_id,
            previous_values: entry.previous_values,
            new_values: entry.new_values,
            ip_address: entry.ip_address,
            user_agent: entry.user_agent,
            status: entry.status.to_string(),
            error_message: entry.error_message,
            created_at: entry.created_at,
        }
    }
}

// ============================================================================
// Threat DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ListThreatsQuery {
    #[validate(length(max = 200))]
    pub status: Option<String>,
    #[validate(length(max = 200))]
    pub severity: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateThreatRequest {
    #[serde(default)]
    #[validate(length(max = 200))]
    pub classification: String,
    #[serde(default)]
    #[validate(length(max = 10000))]
    pub description: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub detection_source: String,
    pub detected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub related_incidents: Vec<Uuid>,
}

impl CreateThreatRequest {
    pub fn into_new_threat(self) -> Result<NewThreat, ApiError> {
        let severity = parse_field::<Severity>("severity", Some(self.severity.as_str()))?
            .ok_or_else(|| {
                ApiError::validation_field("severity", "required", "severity is required")
            })?;
        Ok(NewThreat {
            classification: self.classification,
            description: self.description,
            severity,
            detection_source: self.detection_source,
            detected_at: self.detected_at,
            related_incidents: self.related_incidents,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct InvestigateRequest {
    #[validate(length(max = 10000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThreatResponse {
    pub id: Uuid,
    pub classification: String,
    pub description: String,
    pub severity: String,
    pub status: String,
    pub detected_at: DateTime<Utc>,
    pub detection_source: String,
    pub investigated_at: Option<DateTime<Utc>>,
    pub investigated_by: Option<UserResponse>,
    pub investigation_notes: Option<String>,
    pub related_incidents: Vec<IncidentSummaryResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ThreatDetail> for ThreatResponse {
    fn from(detail: ThreatDetail) -> Self {
        let threat = detail.threat;
        Self {
            id: threat.id,
            classification: threat.classification,
            description: threat.description,
            severity: threat.severity.to_string(),
            status: threat.status.to_string(),
            detected_at: threat.detected_at,
            detection_source: threat.detection_source,
            investigated_at: threat.investigated_at,
            investigated_by: detail.investigated_by.map(Into::into),
            investigation_notes: threat.investigation_notes,
            related_incidents: detail
                .related_incidents
                .into_iter()
                .map(Into::into)
                .collect(),
            created_at: threat.created_at,
            updated_at: threat.updated_at,
        }
    }
}

// ============================================================================
// Alert DTOs
// ============================================================================

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListAlertsQuery {
    pub unread_only: Option<bool>,
    pub include_archived: Option<bool>,
    #[validate(range(min = 1, max = 200))]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlertResponse {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub title: String,
    pub message: String,
    pub severity: String,
    pub recipient_id: Option<Uuid>,
    pub related_resource_id: Uuid,
    pub is_read: bool,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl From<Alert> for AlertResponse {
    fn from(alert: Alert) -> Self {
        Self {
            id: alert.id,
            alert_type: alert.alert_type.to_string(),
            title: alert.title,
            message: alert.message,
            severity: alert.severity.to_string(),
            recipient_id: alert.recipient_id,
            related_resource_id: alert.related_resource_id,
            is_read: alert.is_read,
            is_archived: alert.is_archived,
            created_at: alert.created_at,
            read_at: alert.read_at,
            archived_at: alert.archived_at,
        }
    }
}

// ============================================================================
// Dashboard DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusCountsResponse {
    pub open: u64,
    pub in_progress: u64,
    pub resolved: u64,
    pub closed: u64,
}

impl From<StatusCounts> for StatusCountsResponse {
    fn from(c: StatusCounts) -> Self {
        Self {
            open: c.open,
            in_progress: c.in_progress,
            resolved: c.resolved,
            closed: c.closed,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SeverityCountsResponse {
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
    pub info: u64,
}

impl From<SeverityCounts> for SeverityCountsResponse {
    fn from(c: SeverityCounts) -> Self {
        Self {
            critical: c.critical,
            high: c.high,
            medium: c.medium,
            low: c.low,
            info: c.info,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetricsResponse {
    pub total_incidents: u64,
    pub incidents_by_status: StatusCountsResponse,
    pub incidents_by_severity: SeverityCountsResponse,
    pub active_threats: u64,
    pub recent_incidents: Vec<IncidentResponse>,
    pub recent_alerts: Vec<AlertResponse>,
}

impl From<DashboardMetrics> for DashboardMetricsResponse {
    fn from(m: DashboardMetrics) -> Self {
        Self {
            total_incidents: m.total_incidents,
            incidents_by_status: m.incidents_by_status.into(),
            incidents_by_severity: m.incidents_by_severity.into(),
            active_threats: m.active_threats,
            recent_incidents: m.recent_incidents.into_iter().map(Into::into).collect(),
            recent_alerts: m.recent_alerts.into_iter().map(Into::into).collect(),
        }
    }
}

// ============================================================================
// Log feed DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RecentLogsQuery {
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LogEntryResponse {
    pub timestamp: DateTime<Utc>,
    /// One of `info`, `warn`, `error`, `critical`.
    pub level: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl From<LogEntry> for LogEntryResponse {
    fn from(entry: LogEntry) -> Self {
        let level = serde_json::to_value(entry.level)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default();
        Self {
            timestamp: entry.timestamp,
            level,
            message: entry.message,
            source: entry.source,
        }
    }
}

// ============================================================================
// Health DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: DatabaseHealth,
    pub log_feed: LogFeedHealth,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseHealth {
    pub connected: bool,
    pub db_type: String,
    pub pool_size: u32,
    pub idle_connections: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogFeedHealth {
    pub subscribers: usize,
    pub history_size: usize,
}
