//! Mock implementation of AlertRepository for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::alert::{Alert, AlertReceipt};
use crate::db::{AlertFilter, AlertRepository, DbError};

/// Mock implementation of AlertRepository using in-memory storage.
pub struct MockAlertRepository {
    alerts: Arc<RwLock<HashMap<Uuid, Alert>>>,
    receipts: Arc<RwLock<HashMap<(Uuid, Uuid), AlertReceipt>>>,
}

impl Default for MockAlertRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAlertRepository {
    pub fn new() -> Self {
        Self {
            alerts: Arc::new(RwLock::new(HashMap::new())),
            receipts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_alerts(alerts: Vec<Alert>) -> Self {
        let map = alerts.into_iter().map(|a| (a.id, a)).collect();
        Self {
            alerts: Arc::new(RwLock::new(map)),
            receipts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Gets a snapshot of all stored alerts.
    pub async fn snapshot(&self) -> Vec<Alert> {
        self.alerts.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl AlertRepository for MockAlertRepository {
    async fn create(&self, alert: &Alert) -> Result<Alert, DbError> {
        self.alerts.write().await.insert(alert.id, alert.clone());
        Ok(alert.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Alert>, DbError> {
        Ok(self.alerts.read().await.get(&id).cloned())
    }

    async fn get_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Alert>, DbError> {
        let alerts = self.alerts.read().await;
        let receipts = self.receipts.read().await;
        Ok(alerts
            .get(&id)
            .filter(|a| a.is_visible_to(user_id))
            .map(|a| a.clone().with_receipt(receipts.get(&(id, user_id)))))
    }

    async fn list(&self, filter: &AlertFilter) -> Result<Vec<Alert>, DbError> {
        let alerts = self.alerts.read().await;
        let receipts = self.receipts.read().await;
        let mut result: Vec<Alert> = alerts
            .values()
            .map(|a| match filter.visible_to {
                Some(user) => a.clone().with_receipt(receipts.get(&(a.id, user))),
                None => a.clone(),
            })
            .filter(|a| filter.matches(a))
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            result.truncate(limit as usize);
        }
        Ok(result)
    }

    async fn save(&self, alert: &Alert) -> Result<Alert, DbError> {
        let mut alerts = self.alerts.write().await;
        match alerts.get_mut(&alert.id) {
            Some(existing) => {
                *existing = alert.clone();
                Ok(alert.clone())
            }
            None => Err(DbError::not_found("Alert", alert.id)),
        }
    }

    async fn save_receipt(&self, receipt: &AlertReceipt) -> Result<(), DbError> {
        if !self.alerts.read().await.contains_key(&receipt.alert_id) {
            return Err(DbError::not_found("Alert", receipt.alert_id));
        }
        self.receipts
            .write()
            .await
            .insert((receipt.alert_id, receipt.user_id), receipt.clone());
        Ok(())
    }
}
