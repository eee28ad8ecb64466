//! Domain services.
//!
//! Services own the business rules on top of the repositories: validation,
//! derived fields, alert fan-out, audit trails, and live feed events. They are
//! cheap to construct (every field is an `Arc`) and are built per request.

pub mod alert;
pub mod auth;
pub mod dashboard;
pub mod incident;
pub mod threat;

pub use alert::{AlertQuery, AlertService};
pub use auth::{AuthService, LoginResponse};
pub use dashboard::{DashboardMetrics, DashboardService, SeverityCounts, StatusCounts};
pub use incident::{IncidentDetail, IncidentService};
pub use threat::{ThreatDetail, ThreatService};

use crate::auth::{PasswordError, TokenError, UserSummary};
use crate::db::{DbError, UserRepository};
use crate::feed::{LogEntry, LogFeed, LogLevel};
use crate::incident::Severity;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// Errors returned by the domain services.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The named entity does not exist (or is not visible to the caller).
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User already exists")]
    UserExists,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Password error: {0}")]
    Password(#[from] PasswordError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error(transparent)]
    Db(#[from] DbError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Rejects blank required fields.
pub(crate) fn require(field: &str, value: &str) -> ServiceResult<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

/// Feed level used for events about something of the given severity.
pub(crate) fn feed_level(severity: Severity) -> LogLevel {
    match severity {
        Severity::Critical => LogLevel::Critical,
        Severity::High => LogLevel::Error,
        Severity::Medium => LogLevel::Warn,
        Severity::Low | Severity::Info => LogLevel::Info,
    }
}

pub(crate) async fn publish(feed: &LogFeed, level: LogLevel, source: &str, message: String) {
    feed.publish(LogEntry::new(level, message).with_source(source)).await;
}

/// Resolves user ids to summaries, caching lookups for one response.
pub(crate) struct UserLookup<'a> {
    users: &'a dyn UserRepository,
    cache: HashMap<Uuid, Option<UserSummary>>,
}

impl<'a> UserLookup<'a> {
    pub(crate) fn new(users: &'a dyn UserRepository) -> Self {
        Self {
            users,
            cache: HashMap::new(),
        }
    }

    /// Returns the summary for `id`, or `None` if the user no longer exists.
    pub(crate) async fn summary(&mut self, id: Option<Uuid>) -> ServiceResult<Option<UserSummary>> {
        let Some(id) = id else {
            return Ok(None);
        };
        if let Some(cached) = self.cache.get(&id) {
            return Ok(cached.clone());
        }
        let summary = self.users.get(id).await?.map(|u| u.summary());
        self.cache.insert(id, summary.clone());
        Ok(summary)
    }
}
