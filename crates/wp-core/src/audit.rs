//! Audit trail records for mutating operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Action names written by the services.
pub mod actions {
    pub const UPDATE_INCIDENT: &str = "UPDATE_INCIDENT";
    pub const DELETE_INCIDENT: &str = "DELETE_INCIDENT";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditStatus {
    Success,
    Failure,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Success => "Success",
            AuditStatus::Failure => "Failure",
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "success" => Ok(AuditStatus::Success),
            "failure" => Ok(AuditStatus::Failure),
            _ => Err(format!("Invalid audit status: {}", s)),
        }
    }
}

/// Where a request came from, recorded with each audit entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub ip_address: String,
    pub user_agent: String,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            ip_address: "0.0.0.0".to_string(),
            user_agent: "API".to_string(),
        }
    }
}

/// A single audit trail entry with before/after snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Uuid,
    pub previous_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub ip_address: String,
    pub user_agent: String,
    pub status: AuditStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditLog {
    /// Creates a successful audit entry.
    pub fn success(
        user_id: Uuid,
        action: impl Into<String>,
        resource_type: impl Into<String>,
        resource_id: Uuid,
        context: &RequestContext,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            action: action.into(),
            resource_type: resource_type.into(),
            resource_id,
            previous_values: None,
            new_values: None,
            ip_address: context.ip_address.clone(),
            user_agent: context.user_agent.clone(),
            status: AuditStatus::Success,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_previous(mut self, values: serde_json::Value) -> Self {
        self.previous_values = Some(values);
        self
    }

    pub fn with_new(mut self, values: serde_json::Value) -> Self {
        self.new_values = Some(values);
        self
    }
}
