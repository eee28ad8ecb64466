//! Axum extractors for authentication and authorization.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::debug;
use wp_core::auth::{Role, User};

use crate::error::ApiError;
use crate::state::AppState;

use super::bearer_token;

/// Extractor for authenticated users.
///
/// Reads the bearer token, verifies it, and loads the user. Returns 401 when
/// the header is missing or the token is invalid, and 403 `ACCOUNT_DISABLED`
/// when the account is no longer active.
///
/// # Example
///
/// ```ignore
/// async fn protected_endpoint(
///     AuthenticatedUser(user): AuthenticatedUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct AuthenticatedUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("No token provided".to_string()))?;

        let user = authenticate_token(&app_state, token).await?;
        Ok(AuthenticatedUser(user))
    }
}

/// Resolves a raw token to an active user.
pub(crate) async fn authenticate_token(state: &AppState, token: &str) -> Result<User, ApiError> {
    state.auth_service().authenticate(token).await.map_err(|e| {
        debug!(error = %e, "Token authentication failed");
        ApiError::from(e)
    })
}

fn require_role(user: User, allowed: &[Role]) -> Result<User, ApiError> {
    if !user.role.is_one_of(allowed) {
        debug!(user_id = %user.id, role = %user.role, "Role gate rejected request");
        return Err(ApiError::Forbidden("Insufficient permissions".to_string()));
    }
    Ok(user)
}

/// Extractor that requires admin role.
pub struct RequireAdmin(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;
        Ok(RequireAdmin(require_role(user, &[Role::Admin])?))
    }
}

/// Extractor that allows admins and analysts.
///
/// Returns 403 Forbidden for viewers.
pub struct RequireAnalyst(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAnalyst
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;
        Ok(RequireAnalyst(require_role(
            user,
            &[Role::Admin, Role::Analyst],
        )?))
    }
}
