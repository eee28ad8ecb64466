//! Mock implementations of repository traits for testing.
//!
//! These mocks use in-memory storage and do not require a database connection.
//! Services and route handlers can be exercised against them directly, or
//! through [`Repositories::in_memory`](crate::db::Repositories::in_memory).

mod alert_repo;
mod audit_repo;
mod incident_repo;
mod threat_repo;
mod user_repo;

pub use alert_repo::MockAlertRepository;
pub use audit_repo::MockAuditRepository;
pub use incident_repo::MockIncidentRepository;
pub use threat_repo::MockThreatRepository;
pub use user_repo::MockUserRepository;
