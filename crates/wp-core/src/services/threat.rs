//! Threat tracking: detection records, investigation, and resolution.

use super::{feed_level, publish, require, ServiceError, ServiceResult, UserLookup};
use crate::alert::Alert;
use crate::auth::{User, UserSummary};
use crate::db::{Repositories, ThreatFilter};
use crate::feed::{LogFeed, LogLevel};
use crate::incident::{Incident, Severity};
use crate::threat::{NewThreat, Threat};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

const FEED_SOURCE: &str = "THREAT-INTEL";

/// A threat with its investigator and related incidents resolved.
#[derive(Debug, Clone)]
pub struct ThreatDetail {
    pub threat: Threat,
    pub investigated_by: Option<UserSummary>,
    /// Related incidents that still exist.
    pub related_incidents: Vec<Incident>,
}

#[derive(Clone)]
pub struct ThreatService {
    repos: Repositories,
    feed: Arc<LogFeed>,
}

impl ThreatService {
    pub fn new(repos: Repositories, feed: Arc<LogFeed>) -> Self {
        Self { repos, feed }
    }

    /// Records a detected threat. Critical threats raise a broadcast alert.
    #[instrument(skip(self, input))]
    pub async fn create(&self, input: NewThreat) -> ServiceResult<ThreatDetail> {
        require("classification", &input.classification)?;
        require("description", &input.description)?;
        require("detectionSource", &input.detection_source)?;

        let mut threat = Threat::new(
            input.classification.trim(),
            input.description,
            input.severity,
            input.detection_source.trim(),
        );
        threat.detected_at = input.detected_at.unwrap_or_else(Utc::now);
        threat.related_incidents = input.related_incidents;

        let threat = self.repos.threats.create(&threat).await?;
        info!(threat_id = %threat.id, severity = %threat.severity, "Threat recorded");

        if threat.severity == Severity::Critical {
            let alert = self
                .repos
                .alerts
                .create(&Alert::for_critical_threat(&threat))
                .await?;
            info!(alert_id = %alert.id, threat_id = %threat.id, "Critical threat alert broadcast");
        }

        publish(
            &self.feed,
            feed_level(threat.severity),
            FEED_SOURCE,
            format!(
                "Threat detected: {} via {} [{}]",
                threat.classification, threat.detection_source, threat.severity
            ),
        )
        .await;

        self.populate(threat).await
    }

    /// Lists threats, most recently detected first.
    pub async fn list(&self, filter: &ThreatFilter) -> ServiceResult<Vec<ThreatDetail>> {
        let threats = self.repos.threats.list(filter).await?;
        let mut lookup = UserLookup::new(self.repos.users.as_ref());
        let mut details = Vec::with_capacity(threats.len());
        for threat in threats {
            details.push(self.populate_with(&mut lookup, threat).await?);
        }
        Ok(details)
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<ThreatDetail> {
        let threat = self.find(id).await?;
        self.populate(threat).await
    }

    /// Marks a threat investigated by `actor`, replacing any earlier notes.
    #[instrument(skip(self, notes, actor), fields(actor = %actor.id))]
    pub async fn investigate(
        &self,
        id: Uuid,
        notes: Option<String>,
        actor: &User,
    ) -> ServiceResult<ThreatDetail> {
        let mut threat = self.find(id).await?;
        threat.mark_investigated(actor.id, notes);
        let threat = self.repos.threats.save(&threat).await?;

        info!(threat_id = %id, "Threat investigated");
        publish(
            &self.feed,
            LogLevel::Info,
            FEED_SOURCE,
            format!(
                "Threat investigated: {} by {}",
                threat.classification, actor.name
            ),
        )
        .await;

        self.populate(threat).await
    }

    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn resolve(&self, id: Uuid, actor: &User) -> ServiceResult<ThreatDetail> {
        let mut threat = self.find(id).await?;
        threat.mark_resolved();
        let threat = self.repos.threats.save(&threat).await?;

        info!(threat_id = %id, "Threat resolved");
        self.populate(threat).await
    }

    async fn find(&self, id: Uuid) -> ServiceResult<Threat> {
        self.repos
            .threats
            .get(id)
            .await?
            .ok_or(ServiceError::NotFound("Threat"))
    }

    async fn populate(&self, threat: Threat) -> ServiceResult<ThreatDetail> {
        let mut lookup = UserLookup::new(self.repos.users.as_ref());
        self.populate_with(&mut lookup, threat).await
    }

    async fn populate_with(
        &self,
        lookup: &mut UserLookup<'_>,
        threat: Threat,
    ) -> ServiceResult<ThreatDetail> {
        let investigated_by = lookup.summary(threat.investigated_by).await?;

        let mut related_incidents = Vec::with_capacity(threat.related_incidents.len());
        for incident_id in &threat.related_incidents {
            if let Some(incident) = self.repos.incidents.get(*incident_id).await? {
                related_incidents.push(incident);
            }
        }

        Ok(ThreatDetail {
            threat,
            investigated_by,
            related_incidents,
        })
    }
}
