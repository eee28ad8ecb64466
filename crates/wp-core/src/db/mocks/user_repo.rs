//! Mock implementation of UserRepository for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::User;
use crate::db::{DbError, UserRepository};

/// Mock implementation of UserRepository using in-memory storage.
pub struct MockUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl Default for MockUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockUserRepository {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Creates a mock repository pre-populated with users.
    pub fn with_users(users: Vec<User>) -> Self {
        let map: HashMap<Uuid, User> = users.into_iter().map(|u| (u.id, u)).collect();
        Self {
            users: Arc::new(RwLock::new(map)),
        }
    }

    /// Gets a snapshot of all users in the mock.
    pub async fn snapshot(&self) -> Vec<User> {
        self.users.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn create(&self, user: &User) -> Result<User, DbError> {
        let mut users = self.users.write().await;

        if users.values().any(|existing| existing.email == user.email) {
            return Err(DbError::Duplicate(format!(
                "User with email '{}' already exists",
                user.email
            )));
        }

        users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>, DbError> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn update_last_login(&self, id: Uuid) -> Result<(), DbError> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| DbError::not_found("User", id))?;
        let now = Utc::now();
        user.last_login_at = Some(now);
        user.updated_at = now;
        Ok(())
    }

    async fn any_exist(&self) -> Result<bool, DbError> {
        Ok(!self.users.read().await.is_empty())
    }
}
