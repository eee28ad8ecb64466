//! # wp-core
//!
//! Domain model, persistence, and services for the Watchpost SOC dashboard.
//!
//! This crate provides the incident, threat, alert, and audit models, the
//! authentication primitives, the repository layer over SQLite/PostgreSQL, the
//! domain services used by the HTTP API, the keyword threat-scoring heuristic,
//! and the live log feed.

pub mod alert;
pub mod audit;
pub mod auth;
pub mod db;
pub mod feed;
pub mod incident;
pub mod scoring;
pub mod services;
pub mod threat;

pub use alert::{Alert, AlertReceipt, AlertType};
pub use audit::{AuditLog, AuditStatus, RequestContext};
pub use feed::{LogEntry, LogFeed, LogLevel};
pub use incident::{Incident, IncidentPatch, IncidentStatus, NewIncident, Severity};
pub use scoring::{assess, Confidence, ThreatAssessment};
pub use services::ServiceError;
pub use threat::{NewThreat, Threat, ThreatStatus};

// Auth exports
pub use auth::password::{hash_password, verify_password, PasswordError};
pub use auth::{Role, TokenService, User, UserStatus, UserSummary};
