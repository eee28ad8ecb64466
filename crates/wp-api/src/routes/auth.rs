//! Authentication endpoints: login, registration, logout, and current user.

use axum::{extract::State, http::StatusCode, routing::get, routing::post, Json, Router};
use tracing::info;
use validator::Validate;
use wp_core::ServiceError;
use wp_observability::metrics::record_login;

use crate::auth::AuthenticatedUser;
use crate::dto::{LoginRequest, LoginResponseDto, MessageResponse, RegisterRequest, UserResponse};
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::AppState;

/// Creates the auth routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

/// Exchange credentials for a session token.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login succeeded", body = LoginResponseDto),
        (status = 400, description = "Missing email or password", body = crate::error::ErrorResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse)
    ),
    tag = "Auth"
)]
async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponseDto>, ApiError> {
    request.validate()?;
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::validation("Email and password required"));
    }

    match state
        .auth_service()
        .login(&request.email, &request.password)
        .await
    {
        Ok(response) => {
            record_login("success");
            Ok(Json(response.into()))
        }
        Err(e) => {
            if matches!(e, ServiceError::InvalidCredentials) {
                record_login("failure");
            }
            Err(e.into())
        }
    }
}

/// Self-service registration. New accounts get the Analyst role.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Missing fields or user already exists", body = crate::error::ErrorResponse)
    ),
    tag = "Auth"
)]
async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    request.validate()?;

    let user = state
        .auth_service()
        .register(&request.email, &request.name, &request.password)
        .await?;

    info!(user_id = %user.id, "User registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Tokens are stateless; logout only acknowledges the request.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Auth"
)]
async fn logout(AuthenticatedUser(user): AuthenticatedUser) -> Json<MessageResponse> {
    info!(user_id = %user.id, "User logged out");
    Json(MessageResponse::new("Logged out successfully"))
}

/// The authenticated user's profile.
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Auth"
)]
async fn me(AuthenticatedUser(user): AuthenticatedUser) -> Json<UserResponse> {
    Json(user.summary().into())
}
