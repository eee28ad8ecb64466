//! Alert notifications raised for users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::incident::{Incident, Severity};
use crate::threat::Threat;

/// What kind of event raised an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertType {
    Incident,
    Threat,
    System,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Incident => "Incident",
            AlertType::Threat => "Threat",
            AlertType::System => "System",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "incident" => Ok(AlertType::Incident),
            "threat" => Ok(AlertType::Threat),
            "system" => Ok(AlertType::System),
            _ => Err(format!("Invalid alert type: {}", s)),
        }
    }
}

/// A notification for one recipient, or for everyone when `recipient_id` is `None`.
///
/// Read and archive flags of a broadcast are per user: they come from that
/// user's [`AlertReceipt`], never from the shared row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub recipient_id: Option<Uuid>,
    pub related_resource_id: Uuid,
    pub is_read: bool,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn new(
        alert_type: AlertType,
        title: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
        recipient_id: Option<Uuid>,
        related_resource_id: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            alert_type,
            title: title.into(),
            message: message.into(),
            severity,
            recipient_id,
            related_resource_id,
            is_read: false,
            is_archived: false,
            created_at: Utc::now(),
            read_at: None,
            archived_at: None,
        }
    }

    /// Alert raised for the creator of a critical incident.
    pub fn for_critical_incident(incident: &Incident) -> Self {
        Self::new(
            AlertType::Incident,
            format!("Critical Incident: {}", incident.title),
            incident.description.clone(),
            incident.severity,
            Some(incident.created_by),
            incident.id,
        )
    }

    /// Broadcast alert raised for a critical threat.
    pub fn for_critical_threat(threat: &Threat) -> Self {
        Self::new(
            AlertType::Threat,
            format!("Critical Threat: {}", threat.classification),
            threat.description.clone(),
            threat.severity,
            None,
            threat.id,
        )
    }

    /// Returns true if `user_id` may see this alert.
    pub fn is_visible_to(&self, user_id: Uuid) -> bool {
        self.recipient_id.map_or(true, |recipient| recipient == user_id)
    }

    pub fn is_broadcast(&self) -> bool {
        self.recipient_id.is_none()
    }

    /// Applies one user's receipt to a broadcast. Addressed alerts are unchanged.
    pub fn with_receipt(mut self, receipt: Option<&AlertReceipt>) -> Self {
        if self.is_broadcast() {
            self.read_at = receipt.and_then(|r| r.read_at);
            self.archived_at = receipt.and_then(|r| r.archived_at);
            self.is_read = self.read_at.is_some();
            self.is_archived = self.archived_at.is_some();
        }
        self
    }

    /// The receipt recording `user_id`'s current view of this alert.
    pub fn receipt_for(&self, user_id: Uuid) -> AlertReceipt {
        AlertReceipt {
            alert_id: self.id,
            user_id,
            read_at: self.read_at,
            archived_at: self.archived_at,
        }
    }

    pub fn mark_read(&mut self) {
        if !self.is_read {
            self.is_read = true;
            self.read_at = Some(Utc::now());
        }
    }

    pub fn archive(&mut self) {
        if !self.is_archived {
            self.is_archived = true;
            self.archived_at = Some(Utc::now());
        }
    }
}

/// One user's read and archive state for a broadcast alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertReceipt {
    pub alert_id: Uuid,
    pub user_id: Uuid,
    pub read_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}
