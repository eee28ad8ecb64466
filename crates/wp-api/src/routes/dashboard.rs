//! Dashboard summary endpoint.

use axum::{extract::State, routing::get, Json, Router};

use crate::auth::AuthenticatedUser;
use crate::dto::DashboardMetricsResponse;
use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/metrics", get(dashboard_metrics))
}

/// Incident counts, active threats, and the caller's recent alerts.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/metrics",
    responses(
        (status = 200, description = "Dashboard summary", body = DashboardMetricsResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Dashboard"
)]
async fn dashboard_metrics(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<DashboardMetricsResponse>, ApiError> {
    let metrics = state.dashboard_service().metrics(user.id).await?;
    Ok(Json(metrics.into()))
}
