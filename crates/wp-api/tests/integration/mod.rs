//! Integration test modules.

pub mod alert_dashboard_tests;
pub mod auth_tests;
pub mod common;
pub mod health_tests;
pub mod incident_tests;
pub mod logs_tests;
pub mod threat_tests;
