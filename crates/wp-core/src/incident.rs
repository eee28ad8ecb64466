//! Incident types for Watchpost.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Severity shared by incidents, threats, and alerts.
///
/// Variants are declared from least to most severe so that `Ord` ranks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All severities, most severe first.
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];

    /// Returns the canonical name, as stored in the database and sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "info" | "informational" => Ok(Severity::Info),
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("Invalid severity: {}", s)),
        }
    }
}

/// Lifecycle status of an incident.
///
/// The order `Open -> In Progress -> Resolved -> Closed` is conventional only;
/// updates may move an incident to any status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncidentStatus {
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
    Closed,
}

impl IncidentStatus {
    pub const ALL: [IncidentStatus; 4] = [
        IncidentStatus::Open,
        IncidentStatus::InProgress,
        IncidentStatus::Resolved,
        IncidentStatus::Closed,
    ];

    /// Returns the canonical name, as stored in the database and sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Open => "Open",
            IncidentStatus::InProgress => "In Progress",
            IncidentStatus::Resolved => "Resolved",
            IncidentStatus::Closed => "Closed",
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncidentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect();
        match normalized.as_str() {
            "open" => Ok(IncidentStatus::Open),
            "inprogress" => Ok(IncidentStatus::InProgress),
            "resolved" => Ok(IncidentStatus::Resolved),
            "closed" => Ok(IncidentStatus::Closed),
            _ => Err(format!("Invalid incident status: {}", s)),
        }
    }
}

/// A tracked security incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub status: IncidentStatus,
    /// Free-form classification such as "Phishing" or "Malware".
    #[serde(rename = "type")]
    pub incident_type: String,
    pub created_by: Uuid,
    pub assigned_to: Option<Uuid>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Incident {
    /// Creates a new open incident.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        incident_type: impl Into<String>,
        created_by: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            severity,
            status: IncidentStatus::Open,
            incident_type: incident_type.into(),
            created_by,
            assigned_to: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
            resolved_at: None,
            closed_at: None,
        }
    }

    /// Applies a partial update in place.
    ///
    /// Moving into `Resolved` or `Closed` stamps the matching timestamp.
    pub fn apply(&mut self, patch: &IncidentPatch) {
        let now = Utc::now();

        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(severity) = patch.severity {
            self.severity = severity;
        }
        if let Some(incident_type) = &patch.incident_type {
            self.incident_type = incident_type.clone();
        }
        if let Some(assigned_to) = patch.assigned_to {
            self.assigned_to = assigned_to;
        }
        if let Some(tags) = &patch.tags {
            self.tags = tags.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
            match status {
                IncidentStatus::Resolved => self.resolved_at = Some(now),
                IncidentStatus::Closed => self.closed_at = Some(now),
                IncidentStatus::Open | IncidentStatus::InProgress => {}
            }
        }

        self.updated_at = now;
    }
}

/// Input for creating an incident.
#[derive(Debug, Clone, Default)]
pub struct NewIncident {
    pub title: String,
    pub description: String,
    /// When absent, severity is derived from the description.
    pub severity: Option<Severity>,
    pub incident_type: String,
    pub assigned_to: Option<Uuid>,
    pub tags: Vec<String>,
}

/// Partial update of an incident. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct IncidentPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub severity: Option<Severity>,
    pub status: Option<IncidentStatus>,
    pub incident_type: Option<String>,
    /// `Some(None)` clears the assignee.
    pub assigned_to: Option<Option<Uuid>>,
    pub tags: Option<Vec<String>>,
}
