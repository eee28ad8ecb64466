//! Mock implementation of AuditRepository for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::audit::AuditLog;
use crate::db::{AuditRepository, DbError};

/// Mock implementation of AuditRepository using an in-memory append log.
pub struct MockAuditRepository {
    entries: Arc<RwLock<Vec<AuditLog>>>,
}

impl Default for MockAuditRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAuditRepository {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Gets a snapshot of all entries in insertion order.
    pub async fn snapshot(&self) -> Vec<AuditLog> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl AuditRepository for MockAuditRepository {
    async fn create(&self, entry: &AuditLog) -> Result<AuditLog, DbError> {
        self.entries.write().await.push(entry.clone());
        Ok(entry.clone())
    }

    async fn list_for_resource(
        &self,
        resource_type: &str,
        resource_id: Uuid,
    ) -> Result<Vec<AuditLog>, DbError> {
        let entries = self.entries.read().await;
        // Reverse insertion order keeps same-instant entries newest first.
        let mut result: Vec<AuditLog> = entries
            .iter()
            .rev()
            .filter(|e| e.resource_type == resource_type && e.resource_id == resource_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }
}
