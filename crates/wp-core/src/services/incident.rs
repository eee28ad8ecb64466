//! Incident lifecycle: create, query, update, delete, and audit history.

use super::{feed_level, publish, require, ServiceError, ServiceResult, UserLookup};
use crate::alert::Alert;
use crate::audit::{actions, AuditLog, RequestContext};
use crate::auth::{User, UserSummary};
use crate::db::{IncidentFilter, PaginatedResult, Pagination, Repositories, UserRepository};
use crate::feed::{LogFeed, LogLevel};
use crate::incident::{Incident, IncidentPatch, NewIncident, Severity};
use crate::scoring;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

const FEED_SOURCE: &str = "INCIDENT-MGR";
const RESOURCE_TYPE: &str = "Incident";

/// An incident with its creator and assignee resolved to user summaries.
#[derive(Debug, Clone)]
pub struct IncidentDetail {
    pub incident: Incident,
    pub created_by: Option<UserSummary>,
    pub assigned_to: Option<UserSummary>,
}

#[derive(Clone)]
pub struct IncidentService {
    repos: Repositories,
    feed: Arc<LogFeed>,
}

impl IncidentService {
    pub fn new(repos: Repositories, feed: Arc<LogFeed>) -> Self {
        Self { repos, feed }
    }

    /// Records a new incident raised by `actor`.
    ///
    /// Without an explicit severity the description is scored. Critical
    /// incidents raise an alert for the creator.
    #[instrument(skip(self, input, actor), fields(actor = %actor.id))]
    pub async fn create(&self, input: NewIncident, actor: &User) -> ServiceResult<IncidentDetail> {
        require("title", &input.title)?;
        require("description", &input.description)?;
        require("type", &input.incident_type)?;

        let severity = input
            .severity
            .unwrap_or_else(|| scoring::assess(&input.description).severity);

        let mut incident = Incident::new(
            input.title.trim(),
            input.description,
            severity,
            input.incident_type.trim(),
            actor.id,
        );
        incident.assigned_to = input.assigned_to;
        incident.tags = input.tags;

        let incident = self.repos.incidents.create(&incident).await?;
        info!(incident_id = %incident.id, severity = %incident.severity, "Incident created");

        if incident.severity == Severity::Critical {
            let alert = self
                .repos
                .alerts
                .create(&Alert::for_critical_incident(&incident))
                .await?;
            info!(
                alert_id = %alert.id,
                incident_id = %incident.id,
                "Critical incident alert raised"
            );
        }

        publish(
            &self.feed,
            feed_level(incident.severity),
            FEED_SOURCE,
            format!("Incident created: {} [{}]", incident.title, incident.severity),
        )
        .await;

        self.populate(incident).await
    }

    /// Lists incidents newest first, one page at a time.
    pub async fn list(
        &self,
        filter: &IncidentFilter,
        pagination: &Pagination,
    ) -> ServiceResult<PaginatedResult<IncidentDetail>> {
        let incidents = self.repos.incidents.list(filter, pagination).await?;
        let total = self.repos.incidents.count(filter).await?;
        let details = populate_all(self.repos.users.as_ref(), incidents).await?;
        Ok(PaginatedResult::new(details, total, pagination))
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<IncidentDetail> {
        let incident = self.find(id).await?;
        self.populate(incident).await
    }

    /// Applies a partial update and records an audit entry with both snapshots.
    ///
    /// Any status may follow any other.
    #[instrument(skip(self, patch, actor, context), fields(actor = %actor.id))]
    pub async fn update(
        &self,
        id: Uuid,
        patch: &IncidentPatch,
        actor: &User,
        context: &RequestContext,
    ) -> ServiceResult<IncidentDetail> {
        let mut incident = self.find(id).await?;
        let previous = serde_json::to_value(&incident).map_err(crate::db::DbError::from)?;

        incident.apply(patch);
        let incident = self.repos.incidents.save(&incident).await?;
        let current = serde_json::to_value(&incident).map_err(crate::db::DbError::from)?;

        let entry =
            AuditLog::success(actor.id, actions::UPDATE_INCIDENT, RESOURCE_TYPE, id, context)
                .with_previous(previous)
                .with_new(current);
        self.repos.audit.create(&entry).await?;

        info!(incident_id = %id, status = %incident.status, "Incident updated");
        publish(
            &self.feed,
            LogLevel::Info,
            FEED_SOURCE,
            format!(
                "Incident updated: {} [{}]",
                incident.title, incident.status
            ),
        )
        .await;

        self.populate(incident).await
    }

    /// Deletes an incident, auditing its last state.
    #[instrument(skip(self, actor, context), fields(actor = %actor.id))]
    pub async fn delete(
        &self,
        id: Uuid,
        actor: &User,
        context: &RequestContext,
    ) -> ServiceResult<()> {
        let incident = self.find(id).await?;
        let previous = serde_json::to_value(&incident).map_err(crate::db::DbError::from)?;

        if !self.repos.incidents.delete(id).await? {
            return Err(ServiceError::NotFound(RESOURCE_TYPE));
        }

        let entry =
            AuditLog::success(actor.id, actions::DELETE_INCIDENT, RESOURCE_TYPE, id, context)
                .with_previous(previous);
        self.repos.audit.create(&entry).await?;

        info!(incident_id = %id, "Incident deleted");
        publish(
            &self.feed,
            LogLevel::Warn,
            FEED_SOURCE,
            format!("Incident deleted: {}", incident.title),
        )
        .await;

        Ok(())
    }

    /// Audit entries for an incident, newest first.
    pub async fn history(&self, id: Uuid) -> ServiceResult<Vec<AuditLog>> {
        Ok(self
            .repos
            .audit
            .list_for_resource(RESOURCE_TYPE, id)
            .await?)
    }

    async fn find(&self, id: Uuid) -> ServiceResult<Incident> {
        self.repos
            .incidents
            .get(id)
            .await?
            .ok_or(ServiceError::NotFound(RESOURCE_TYPE))
    }

    async fn populate(&self, incident: Incident) -> ServiceResult<IncidentDetail> {
        let mut lookup = UserLookup::new(self.repos.users.as_ref());
        populate_one(&mut lookup, incident).await
    }
}

async fn populate_one(
    lookup: &mut UserLookup<'_>,
    incident: Incident,
) -> ServiceResult<IncidentDetail> {
    let created_by = lookup.summary(Some(incident.created_by)).await?;
    let assigned_to = lookup.summary(incident.assigned_to).await?;
    Ok(IncidentDetail {
        incident,
        created_by,
        assigned_to,
    })
}

/// Resolves user summaries for a batch of incidents.
pub(crate) async fn populate_all(
    users: &dyn UserRepository,
    incidents: Vec<Incident>,
) -> ServiceResult<Vec<IncidentDetail>> {
    let mut lookup = UserLookup::new(users);
    let mut details = Vec::with_capacity(incidents.len());
    for incident in incidents {
        details.push(populate_one(&mut lookup, incident).await?);
    }
    Ok(details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::db::AlertFilter;
    use crate::incident::IncidentStatus;

    async fn setup() -> (IncidentService, User, Arc<LogFeed>) {
        let repos = Repositories::in_memory();
        let analyst = User::new("analyst@example.com", "Ana Lyst", "hash", Role::Analyst);
        repos.users.create(&analyst).await.unwrap();
        let feed = Arc::new(LogFeed::default());
        (IncidentService::new(repos, feed.clone()), analyst, feed)
    }

    fn new_incident(title: &str, severity: Option<Severity>) -> NewIncident {
        NewIncident {
            title: title.to_string(),
            description: "Suspicious outbound traffic".to_string(),
            severity,
            incident_type: "Network".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_populates_creator() {
        let (service, analyst, feed) = setup().await;

        let detail = service
            .create(new_incident("Beaconing", Some(Severity::High)), &analyst)
            .await
            .unwrap();

        assert_eq!(detail.incident.status, IncidentStatus::Open);
        assert_eq!(detail.incident.created_by, analyst.id);
        assert_eq!(detail.created_by.unwrap().name, "Ana Lyst");
        assert!(detail.assigned_to.is_none());

        let events = feed.recent(None).await;
        assert_eq!(events.len(), 1);
        assert!(events[0].message.contains("Beaconing"));
    }

    #[tokio::test]
    async fn test_create_requires_fields() {
        let (service, analyst, _) = setup().await;

        let mut input = new_incident("", Some(Severity::Low));
        let err = service.create(input.clone(), &analyst).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref m) if m == "title is required"));

        input.title = "Has title".to_string();
        input.incident_type = String::new();
        let err = service.create(input, &analyst).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref m) if m == "type is required"));
    }

    #[tokio::test]
    async fn test_create_derives_missing_severity() {
        let (service, analyst, _) = setup().await;
        let mut input = new_incident("Locker", None);
        input.description = "Ransomware note found on file server".to_string();

        let detail = service.create(input, &analyst).await.unwrap();
        assert_eq!(detail.incident.severity, Severity::Critical);
    }

    #[tokio::test]
    async fn test_critical_incident_raises_alert_for_creator() {
        let (service, analyst, _) = setup().await;

        let detail = service
            .create(new_incident("Domain takeover", Some(Severity::Critical)), &analyst)
            .await
            .unwrap();
        service
            .create(new_incident("Minor", Some(Severity::Low)), &analyst)
            .await
            .unwrap();

        let alerts = service
            .repos
            .alerts
            .list(&AlertFilter::default())
            .await
            .unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].title, "Critical Incident: Domain takeover");
        assert_eq!(alerts[0].recipient_id, Some(analyst.id));
        assert_eq!(alerts[0].related_resource_id, detail.incident.id);
    }

    #[tokio::test]
    async fn test_list_pages_and_counts() {
        let (service, analyst, _) = setup().await;
        for i in 0..5 {
            service
                .create(new_incident(&format!("incident {}", i), Some(Severity::Medium)), &analyst)
                .await
                .unwrap();
        }

        let page = service
            .list(&IncidentFilter::default(), &Pagination::new(2, 2))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 5);
        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 3);
    }

    #[tokio::test]
    async fn test_update_audits_and_stamps_resolution() {
        let (service, analyst, _) = setup().await;
        let created = service
            .create(new_incident("Phish", Some(Severity::Medium)), &analyst)
            .await
            .unwrap();
        let id = created.incident.id;

        let ctx = RequestContext {
            ip_address: "10.1.2.3".to_string(),
            user_agent: "curl/8.0".to_string(),
        };
        let patch = IncidentPatch {
            status: Some(IncidentStatus::Resolved),
            assigned_to: Some(Some(analyst.id)),
            ..Default::default()
        };
        let updated = service.update(id, &patch, &analyst, &ctx).await.unwrap();

        assert_eq!(updated.incident.status, IncidentStatus::Resolved);
        assert!(updated.incident.resolved_at.is_some());
        assert_eq!(updated.assigned_to.unwrap().id, analyst.id);

        let history = service.history(id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, actions::UPDATE_INCIDENT);
        assert_eq!(history[0].ip_address, "10.1.2.3");
        assert_eq!(history[0].previous_values.as_ref().unwrap()["status"], "Open");
        assert_eq!(history[0].new_values.as_ref().unwrap()["status"], "Resolved");
    }

    #[tokio::test]
    async fn test_status_transitions_are_not_restricted() {
        let (service, analyst, _) = setup().await;
        let id = service
            .create(new_incident("Flip", Some(Severity::Low)), &analyst)
            .await
            .unwrap()
            .incident
            .id;
        let ctx = RequestContext::default();

        for status in [IncidentStatus::Closed, IncidentStatus::Open, IncidentStatus::InProgress] {
            let patch = IncidentPatch {
                status: Some(status),
                ..Default::default()
            };
            let updated = service.update(id, &patch, &analyst, &ctx).await.unwrap();
            assert_eq!(updated.incident.status, status);
        }
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_incident() {
        let (service, analyst, _) = setup().await;
        let ctx = RequestContext::default();

        let err = service
            .update(Uuid::new_v4(), &IncidentPatch::default(), &analyst, &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("Incident")));

        let err = service
            .delete(Uuid::new_v4(), &analyst, &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("Incident")));
    }

    #[tokio::test]
    async fn test_delete_writes_audit_entry() {
        let (service, analyst, _) = setup().await;
        let id = service
            .create(new_incident("Gone", Some(Severity::Low)), &analyst)
            .await
            .unwrap()
            .incident
            .id;

        service
            .delete(id, &analyst, &RequestContext::default())
            .await
            .unwrap();

        assert!(matches!(
            service.get(id).await,
            Err(ServiceError::NotFound(_))
        ));
        let history = service.history(id).await.unwrap();
        assert_eq!(history[0].action, actions::DELETE_INCIDENT);
        assert_eq!(history[0].previous_values.as_ref().unwrap()["title"], "Gone");
    }
}
