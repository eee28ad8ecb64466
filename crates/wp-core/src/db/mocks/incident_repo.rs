//! Mock implementation of IncidentRepository for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::{DbError, IncidentFilter, IncidentRepository, Pagination};
use crate::incident::Incident;

/// Mock implementation of IncidentRepository using in-memory storage.
pub struct MockIncidentRepository {
    incidents: Arc<RwLock<HashMap<Uuid, Incident>>>,
}

impl Default for MockIncidentRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockIncidentRepository {
    pub fn new() -> Self {
        Self {
            incidents: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Creates a mock repository pre-populated with incidents.
    pub fn with_incidents(incidents: Vec<Incident>) -> Self {
        let map = incidents.into_iter().map(|i| (i.id, i)).collect();
        Self {
            incidents: Arc::new(RwLock::new(map)),
        }
    }

    async fn matching(&self, filter: &IncidentFilter) -> Vec<Incident> {
        let incidents = self.incidents.read().await;
        let mut result: Vec<Incident> = incidents
            .values()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        result
    }
}

#[async_trait]
impl IncidentRepository for MockIncidentRepository {
    async fn create(&self, incident: &Incident) -> Result<Incident, DbError> {
        let mut incidents = self.incidents.write().await;
        if incidents.contains_key(&incident.id) {
            return Err(DbError::Duplicate(format!(
                "Incident {} already exists",
                incident.id
            )));
        }
        incidents.insert(incident.id, incident.clone());
        Ok(incident.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Incident>, DbError> {
        Ok(self.incidents.read().await.get(&id).cloned())
    }

    async fn list(
        &self,
        filter: &IncidentFilter,
        pagination: &Pagination,
    ) -> Result<Vec<Incident>, DbError> {
        Ok(self
            .matching(filter)
            .await
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.limit() as usize)
            .collect())
    }

    async fn count(&self, filter: &IncidentFilter) -> Result<u64, DbError> {
        Ok(self.matching(filter).await.len() as u64)
    }

    async fn save(&self, incident: &Incident) -> Result<Incident, DbError> {
        let mut incidents = self.incidents.write().await;
        match incidents.get_mut(&incident.id) {
            Some(existing) => {
                *existing = incident.clone();
                Ok(incident.clone())
            }
            None => Err(DbError::not_found("Incident", incident.id)),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        Ok(self.incidents.write().await.remove(&id).is_some())
    }
}
