//! Login, registration, and token authentication.

use super::{publish, ServiceError, ServiceResult};
use crate::auth::{
    hash_password, normalize_email, verify_password, Role, TokenService, User, UserSummary,
};
use crate::db::{DbError, UserRepository};
use crate::feed::{LogFeed, LogLevel};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

const FEED_SOURCE: &str = "AUTH-SERVICE";

/// Result of a successful login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserSummary,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: TokenService,
    feed: Arc<LogFeed>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: TokenService, feed: Arc<LogFeed>) -> Self {
        Self {
            users,
            tokens,
            feed,
        }
    }

    /// Verifies credentials and issues a session token.
    ///
    /// Unknown emails, inactive accounts, and wrong passwords all yield
    /// `InvalidCredentials`.
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<LoginResponse> {
        let email = normalize_email(email);

        let user = match self.users.get_by_email(&email).await? {
            Some(user) if user.is_active() => user,
            _ => return self.reject_login(&email).await,
        };

        if !verify_password(password, &user.password_hash)? {
            return self.reject_login(&email).await;
        }

        self.users.update_last_login(user.id).await?;
        let issued = self.tokens.issue(&user)?;

        info!(user_id = %user.id, "User logged in");

        Ok(LoginResponse {
            token: issued.token,
            expires_at: issued.expires_at,
            user: user.summary(),
        })
    }

    async fn reject_login<T>(&self, email: &str) -> ServiceResult<T> {
        warn!(email = %email, "Failed login attempt");
        publish(
            &self.feed,
            LogLevel::Warn,
            FEED_SOURCE,
            format!("Failed login attempt for {}", email),
        )
        .await;
        Err(ServiceError::InvalidCredentials)
    }

    /// Self-service registration. New accounts are analysts.
    pub async fn register(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> ServiceResult<UserSummary> {
        let user = self.create_user(email, name, password, Role::Analyst).await?;
        Ok(user.summary())
    }

    /// Creates an active user with the given role.
    pub async fn create_user(
        &self,
        email: &str,
        name: &str,
        password: &str,
        role: Role,
    ) -> ServiceResult<User> {
        super::require("email", email)?;
        super::require("name", name)?;
        super::require("password", password)?;

        let email = normalize_email(email);
        if self.users.get_by_email(&email).await?.is_some() {
            return Err(ServiceError::UserExists);
        }

        let password_hash = hash_password(password)?;
        let user = User::new(&email, name.trim(), password_hash, role);

        let created = self.users.create(&user).await.map_err(|e| match e {
            // Lost a race with a concurrent registration.
            DbError::Duplicate(_) => ServiceError::UserExists,
            other => ServiceError::Db(other),
        })?;

        info!(user_id = %created.id, role = %created.role, "User created");
        Ok(created)
    }

    /// Resolves a bearer token to an active user.
    pub async fn authenticate(&self, token: &str) -> ServiceResult<User> {
        let claims = self.tokens.verify(token).map_err(|e| {
            debug!(error = %e, "Token rejected");
            ServiceError::InvalidToken
        })?;
        let user_id = claims.user_id().map_err(|_| ServiceError::InvalidToken)?;

        let user = self
            .users
            .get(user_id)
            .await?
            .ok_or(ServiceError::InvalidToken)?;

        if !user.is_active() {
            return Err(ServiceError::AccountDisabled);
        }

        Ok(user)
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }
}
