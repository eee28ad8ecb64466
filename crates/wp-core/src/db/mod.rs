//! Database layer for Watchpost.
//!
//! Persistence for users, incidents, threats, alerts, and audit logs using
//! SQLx with support for both SQLite (development) and PostgreSQL (production).

mod error;
pub mod mocks;
mod pagination;
mod pool;
mod schema;

pub mod alert_repo;
pub mod audit_repo;
pub mod incident_repo;
pub mod seed;
pub mod threat_repo;
pub mod user_repo;

use std::sync::Arc;

pub use error::DbError;
pub use pagination::{PaginatedResult, Pagination, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use pool::{create_pool, create_pool_with_options, DbBackend, DbPool, PoolOptions};
pub use schema::run_migrations;

// Re-export repository traits and types
pub use alert_repo::{AlertFilter, AlertRepository};
pub use audit_repo::AuditRepository;
pub use incident_repo::{IncidentFilter, IncidentRepository};
pub use threat_repo::{ThreatFilter, ThreatRepository};
pub use user_repo::UserRepository;

// Re-export factory functions
#[cfg(feature = "database")]
pub use alert_repo::create_alert_repository;
#[cfg(feature = "database")]
pub use audit_repo::create_audit_repository;
#[cfg(feature = "database")]
pub use incident_repo::create_incident_repository;
#[cfg(feature = "database")]
pub use threat_repo::create_threat_repository;
#[cfg(feature = "database")]
pub use user_repo::create_user_repository;

#[cfg(feature = "database")]
pub use seed::ensure_admin_user;
pub use seed::{seed_admin, SeededAdmin};

/// All repositories the services need, behind trait objects.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub incidents: Arc<dyn IncidentRepository>,
    pub threats: Arc<dyn ThreatRepository>,
    pub alerts: Arc<dyn AlertRepository>,
    pub audit: Arc<dyn AuditRepository>,
}

impl Repositories {
    /// Builds the repository set matching the pool's backend.
    #[cfg(feature = "database")]
    pub fn from_pool(pool: &DbPool) -> Self {
        Self {
            users: create_user_repository(pool),
            incidents: create_incident_repository(pool),
            threats: create_threat_repository(pool),
            alerts: create_alert_repository(pool),
            audit: create_audit_repository(pool),
        }
    }

    /// Builds an empty in-memory repository set.
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(mocks::MockUserRepository::new()),
            incidents: Arc::new(mocks::MockIncidentRepository::new()),
            threats: Arc::new(mocks::MockThreatRepository::new()),
            alerts: Arc::new(mocks::MockAlertRepository::new()),
            audit: Arc::new(mocks::MockAuditRepository::new()),
        }
    }
}

/// Formats a timestamp for SQLite TEXT columns.
///
/// Fixed microsecond precision with a `Z` suffix keeps lexical and
/// chronological order identical.
pub(crate) fn to_db_timestamp(ts: &chrono::DateTime<chrono::Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

pub(crate) fn parse_db_timestamp(raw: &str) -> Result<chrono::DateTime<chrono::Utc>, DbError> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| DbError::Serialization(format!("Invalid timestamp: {}", e)))
}

pub(crate) fn parse_opt_db_timestamp(
    raw: Option<String>,
) -> Result<Option<chrono::DateTime<chrono::Utc>>, DbError> {
    raw.as_deref().map(parse_db_timestamp).transpose()
}

pub(crate) fn parse_db_uuid(raw: &str) -> Result<uuid::Uuid, DbError> {
    uuid::Uuid::parse_str(raw).map_err(|e| DbError::Serialization(format!("Invalid UUID: {}", e)))
}

pub(crate) fn parse_opt_db_uuid(raw: Option<String>) -> Result<Option<uuid::Uuid>, DbError> {
    raw.as_deref().map(parse_db_uuid).transpose()
}

/// Parses a stored enum column with its `FromStr` impl.
pub(crate) fn parse_db_enum<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, DbError> {
    raw.parse::<T>()
        .map_err(|_| DbError::Serialization(format!("Invalid {}: {}", what, raw)))
}
