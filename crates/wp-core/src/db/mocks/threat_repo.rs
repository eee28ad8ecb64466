//! Mock implementation of ThreatRepository for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::{DbError, ThreatFilter, ThreatRepository};
use crate::threat::Threat;

/// Mock implementation of ThreatRepository using in-memory storage.
pub struct MockThreatRepository {
    threats: Arc<RwLock<HashMap<Uuid, Threat>>>,
}

impl Default for MockThreatRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockThreatRepository {
    pub fn new() -> Self {
        Self {
            threats: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_threats(threats: Vec<Threat>) -> Self {
        let map = threats.into_iter().map(|t| (t.id, t)).collect();
        Self {
            threats: Arc::new(RwLock::new(map)),
        }
    }
}

#[async_trait]
impl ThreatRepository for MockThreatRepository {
    async fn create(&self, threat: &Threat) -> Result<Threat, DbError> {
        self.threats.write().await.insert(threat.id, threat.clone());
        Ok(threat.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Threat>, DbError> {
        Ok(self.threats.read().await.get(&id).cloned())
    }

    async fn list(&self, filter: &ThreatFilter) -> Result<Vec<Threat>, DbError> {
        let threats = self.threats.read().await;
        let mut result: Vec<Threat> = threats
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.detected_at.cmp(&a.detected_at));
        Ok(result)
    }

    async fn count(&self, filter: &ThreatFilter) -> Result<u64, DbError> {
        let threats = self.threats.read().await;
        Ok(threats.values().filter(|t| filter.matches(t)).count() as u64)
    }

    async fn save(&self, threat: &Threat) -> Result<Threat, DbError> {
        let mut threats = self.threats.write().await;
        match threats.get_mut(&threat.id) {
            Some(existing) => {
                *existing = threat.clone();
                Ok(threat.clone())
            }
            None => Err(DbError::not_found("Threat", threat.id)),
        }
    }
}
