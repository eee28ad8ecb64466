//! Threat detection records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::incident::Severity;

/// Status of a detected threat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThreatStatus {
    Active,
    Investigated,
    Resolved,
}

impl ThreatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatStatus::Active => "Active",
            ThreatStatus::Investigated => "Investigated",
            ThreatStatus::Resolved => "Resolved",
        }
    }
}

impl fmt::Display for ThreatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThreatStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(ThreatStatus::Active),
            "investigated" => Ok(ThreatStatus::Investigated),
            "resolved" => Ok(ThreatStatus::Resolved),
            _ => Err(format!("Invalid threat status: {}", s)),
        }
    }
}

/// A detection record, optionally linked to incidents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Threat {
    pub id: Uuid,
    pub classification: String,
    pub description: String,
    pub severity: Severity,
    pub status: ThreatStatus,
    pub detected_at: DateTime<Utc>,
    /// Sensor or product that raised the detection.
    pub detection_source: String,
    pub investigated_at: Option<DateTime<Utc>>,
    pub investigated_by: Option<Uuid>,
    pub investigation_notes: Option<String>,
    pub related_incidents: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Threat {
    /// Creates a new active threat detected now.
    pub fn new(
        classification: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        detection_source: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            classification: classification.into(),
            description: description.into(),
            severity,
            status: ThreatStatus::Active,
            detected_at: now,
            detection_source: detection_source.into(),
            investigated_at: None,
            investigated_by: None,
            investigation_notes: None,
            related_incidents: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Marks the threat as investigated by `actor`.
    pub fn mark_investigated(&mut self, actor: Uuid, notes: Option<String>) {
        let now = Utc::now();
        self.status = ThreatStatus::Investigated;
        self.investigated_at = Some(now);
        self.investigated_by = Some(actor);
        self.investigation_notes = notes;
        self.updated_at = now;
    }

    pub fn mark_resolved(&mut self) {
        self.status = ThreatStatus::Resolved;
        self.updated_at = Utc::now();
    }
}

/// Input for recording a threat.
#[derive(Debug, Clone)]
pub struct NewThreat {
    pub classification: String,
    pub description: String,
    pub severity: Severity,
    pub detection_source: String,
    /// Defaults to the time of recording.
    pub detected_at: Option<DateTime<Utc>>,
    pub related_incidents: Vec<Uuid>,
}
