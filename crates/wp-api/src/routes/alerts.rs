//! Per-user alert inbox endpoints.

use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;
use wp_core::services::AlertQuery;

use crate::auth::AuthenticatedUser;
use crate::dto::{AlertResponse, ListAlertsQuery};
use crate::error::ApiError;
use crate::extract::{ApiPath, ApiQuery};
use crate::state::AppState;

/// Creates alert routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_alerts))
        .route("/:id/read", put(mark_read))
        .route("/:id/archive", put(archive_alert))
}

/// Alerts addressed to the caller or broadcast to everyone, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/alerts",
    params(
        ("unreadOnly" = Option<bool>, Query, description = "Only unread alerts"),
        ("includeArchived" = Option<bool>, Query, description = "Include archived alerts"),
        ("limit" = Option<u32>, Query, description = "Maximum alerts returned (default 50)")
    ),
    responses(
        (status = 200, description = "Alerts", body = [AlertResponse]),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Alerts"
)]
async fn list_alerts(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiQuery(query): ApiQuery<ListAlertsQuery>,
) -> Result<Json<Vec<AlertResponse>>, ApiError> {
    query.validate()?;

    let defaults = AlertQuery::default();
    let options = AlertQuery {
        unread_only: query.unread_only.unwrap_or(defaults.unread_only),
        include_archived: query.include_archived.unwrap_or(defaults.include_archived),
        limit: query.limit.unwrap_or(defaults.limit),
    };

    let alerts = state.alert_service().list_for_user(user.id, options).await?;
    Ok(Json(alerts.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    put,
    path = "/api/v1/alerts/{id}/read",
    params(("id" = Uuid, Path, description = "Alert ID")),
    responses(
        (status = 200, description = "Alert marked read", body = AlertResponse),
        (status = 404, description = "Alert not found or not visible", body = crate::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Alerts"
)]
async fn mark_read(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<AlertResponse>, ApiError> {
    let alert = state.alert_service().mark_read(id, user.id).await?;
    Ok(Json(alert.into()))
}

#[utoipa::path(
    put,
    path = "/api/v1/alerts/{id}/archive",
    params(("id" = Uuid, Path, description = "Alert ID")),
    responses(
        (status = 200, description = "Alert archived", body = AlertResponse),
        (status = 404, description = "Alert not found or not visible", body = crate::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Alerts"
)]
async fn archive_alert(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<AlertResponse>, ApiError> {
    let alert = state.alert_service().archive(id, user.id).await?;
    Ok(Json(alert.into()))
}
