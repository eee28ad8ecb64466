//! Per-user alert inbox.

use super::{ServiceError, ServiceResult};
use crate::alert::Alert;
use crate::db::{AlertFilter, Repositories};
use tracing::debug;
use uuid::Uuid;

/// Default number of alerts returned by an inbox listing.
pub const DEFAULT_ALERT_LIMIT: u32 = 50;

/// Inbox listing options.
#[derive(Debug, Clone, Copy)]
pub struct AlertQuery {
    pub unread_only: bool,
    pub include_archived: bool,
    pub limit: u32,
}

impl Default for AlertQuery {
    fn default() -> Self {
        Self {
            unread_only: false,
            include_archived: false,
            limit: DEFAULT_ALERT_LIMIT,
        }
    }
}

#[derive(Clone)]
pub struct AlertService {
    repos: Repositories,
}

impl AlertService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Alerts addressed to `user_id` plus broadcasts, newest first.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        query: AlertQuery,
    ) -> ServiceResult<Vec<Alert>> {
        let filter = AlertFilter {
            visible_to: Some(user_id),
            unread_only: query.unread_only,
            include_archived: query.include_archived,
            limit: Some(query.limit),
        };
        Ok(self.repos.alerts.list(&filter).await?)
    }

    pub async fn mark_read(&self, id: Uuid, user_id: Uuid) -> ServiceResult<Alert> {
        let mut alert = self.find_visible(id, user_id).await?;
        alert.mark_read();
        self.persist(alert, user_id).await
    }

    pub async fn archive(&self, id: Uuid, user_id: Uuid) -> ServiceResult<Alert> {
        let mut alert = self.find_visible(id, user_id).await?;
        alert.archive();
        self.persist(alert, user_id).await
    }

    /// Broadcasts keep their shared row untouched; the change goes to the
    /// user's receipt.
    async fn persist(&self, alert: Alert, user_id: Uuid) -> ServiceResult<Alert> {
        if alert.is_broadcast() {
            self.repos
                .alerts
                .save_receipt(&alert.receipt_for(user_id))
                .await?;
            Ok(alert)
        } else {
            Ok(self.repos.alerts.save(&alert).await?)
        }
    }

    /// Alerts addressed to someone else are reported as missing.
    async fn find_visible(&self, id: Uuid, user_id: Uuid) -> ServiceResult<Alert> {
        match self.repos.alerts.get_for_user(id, user_id).await? {
            Some(alert) => Ok(alert),
            None => {
                debug!(alert_id = %id, user_id = %user_id, "Alert missing or not visible to user");
                Err(ServiceError::NotFound("Alert"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertType;
    use crate::incident::Severity;

    fn alert(recipient: Option<Uuid>) -> Alert {
        Alert::new(
            AlertType::Incident,
            "Critical Incident: test",
            "details",
            Severity::Critical,
            recipient,
            Uuid::new_v4(),
        )
    }

    async fn service_with(alerts: &[Alert]) -> AlertService {
        let repos = Repositories::in_memory();
        for a in alerts {
            repos.alerts.create(a).await.unwrap();
        }
        AlertService::new(repos)
    }

    #[tokio::test]
    async fn test_inbox_includes_broadcasts_only_for_visible() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let service = service_with(&[alert(Some(me)), alert(None), alert(Some(other))]).await;

        let inbox = service.list_for_user(me, AlertQuery::default()).await.unwrap();
        assert_eq!(inbox.len(), 2);
        assert!(inbox.iter().all(|a| a.is_visible_to(me)));
    }

    #[tokio::test]
    async fn test_mark_read_and_unread_filter() {
        let me = Uuid::new_v4();
        let mine = alert(Some(me));
        let service = service_with(&[mine.clone(), alert(None)]).await;

        let read = service.mark_read(mine.id, me).await.unwrap();
        assert!(read.is_read);
        assert!(read.read_at.is_some());

        let unread = service
            .list_for_user(
                me,
                AlertQuery {
                    unread_only: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(unread.len(), 1);
        assert_ne!(unread[0].id, mine.id);
    }

    #[tokio::test]
    async fn test_archive_hides_alert_unless_requested() {
        let me = Uuid::new_v4();
        let mine = alert(Some(me));
        let service = service_with(&[mine.clone()]).await;

        let archived = service.archive(mine.id, me).await.unwrap();
        assert!(archived.is_archived);

        assert!(service
            .list_for_user(me, AlertQuery::default())
            .await
            .unwrap()
            .is_empty());
        let all = service
            .list_for_user(
                me,
                AlertQuery {
                    include_archived: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_state_is_per_user() {
        let viewer = Uuid::new_v4();
        let analyst = Uuid::new_v4();
        let broadcast = alert(None);
        let service = service_with(&[broadcast.clone()]).await;

        let archived = service.archive(broadcast.id, viewer).await.unwrap();
        assert!(archived.is_archived);
        service.mark_read(broadcast.id, viewer).await.unwrap();

        assert!(service
            .list_for_user(viewer, AlertQuery::default())
            .await
            .unwrap()
            .is_empty());

        let unread = AlertQuery {
            unread_only: true,
            ..Default::default()
        };
        let inbox = service.list_for_user(analyst, unread).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].id, broadcast.id);
        assert!(!inbox[0].is_read);
        assert!(!inbox[0].is_archived);

        let viewers_copy = service
            .list_for_user(
                viewer,
                AlertQuery {
                    include_archived: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(viewers_copy[0].is_read && viewers_copy[0].is_archived);
    }

    #[tokio::test]
    async fn test_foreign_alert_is_not_found() {
        let owner = Uuid::new_v4();
        let theirs = alert(Some(owner));
        let service = service_with(&[theirs.clone()]).await;

        let err = service.mark_read(theirs.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("Alert")));
        let err = service.archive(Uuid::new_v4(), owner).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("Alert")));
    }
}
