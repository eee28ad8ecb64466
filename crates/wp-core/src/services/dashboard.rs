//! Dashboard aggregation.

use super::incident::{populate_all, IncidentDetail};
use super::ServiceResult;
use crate::alert::Alert;
use crate::db::{
    AlertFilter, IncidentFilter, IncidentRepository, Pagination, Repositories, ThreatFilter,
};
use crate::incident::{IncidentStatus, Severity};
use crate::threat::ThreatStatus;
use serde::Serialize;
use uuid::Uuid;

/// Number of incidents and alerts shown in the recent lists.
pub const RECENT_ITEMS: u32 = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub open: u64,
    pub in_progress: u64,
    pub resolved: u64,
    pub closed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
    pub info: u64,
}

/// Snapshot rendered on the SOC overview page.
#[derive(Debug, Clone)]
pub struct DashboardMetrics {
    pub total_incidents: u64,
    pub incidents_by_status: StatusCounts,
    pub incidents_by_severity: SeverityCounts,
    pub active_threats: u64,
    pub recent_incidents: Vec<IncidentDetail>,
    pub recent_alerts: Vec<Alert>,
}

#[derive(Clone)]
pub struct DashboardService {
    repos: Repositories,
}

impl DashboardService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn metrics(&self, user_id: Uuid) -> ServiceResult<DashboardMetrics> {
        let incidents = self.repos.incidents.as_ref();

        let total_incidents = incidents.count(&IncidentFilter::default()).await?;

        let incidents_by_status = StatusCounts {
            open: count_status(incidents, IncidentStatus::Open).await?,
            in_progress: count_status(incidents, IncidentStatus::InProgress).await?,
            resolved: count_status(incidents, IncidentStatus::Resolved).await?,
            closed: count_status(incidents, IncidentStatus::Closed).await?,
        };

        let incidents_by_severity = SeverityCounts {
            critical: count_severity(incidents, Severity::Critical).await?,
            high: count_severity(incidents, Severity::High).await?,
            medium: count_severity(incidents, Severity::Medium).await?,
            low: count_severity(incidents, Severity::Low).await?,
            info: count_severity(incidents, Severity::Info).await?,
        };

        let active_threats = self
            .repos
            .threats
            .count(&ThreatFilter::with_status(ThreatStatus::Active))
            .await?;

        let recent = incidents
            .list(&IncidentFilter::default(), &Pagination::new(1, RECENT_ITEMS))
            .await?;
        let recent_incidents = populate_all(self.repos.users.as_ref(), recent).await?;

        let recent_alerts = self
            .repos
            .alerts
            .list(&AlertFilter {
                limit: Some(RECENT_ITEMS),
                ..AlertFilter::for_user(user_id)
            })
            .await?;

        Ok(DashboardMetrics {
            total_incidents,
            incidents_by_status,
            incidents_by_severity,
            active_threats,
            recent_incidents,
            recent_alerts,
        })
    }
}

async fn count_status(repo: &dyn IncidentRepository, status: IncidentStatus) -> ServiceResult<u64> {
    Ok(repo.count(&IncidentFilter::with_status(status)).await?)
}

async fn count_severity(repo: &dyn IncidentRepository, severity: Severity) -> ServiceResult<u64> {
    Ok(repo.count(&IncidentFilter::with_severity(severity)).await?)
}
