//! Health check endpoints.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use std::time::Instant;

use crate::dto::{DatabaseHealth, HealthResponse, LogFeedHealth};
use crate::state::AppState;

/// Start time for uptime calculation.
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize the start time.
pub fn init_start_time() {
    START_TIME.get_or_init(Instant::now);
}

/// Creates health check routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/live", get(liveness_check))
}

/// Health check endpoint.
///
/// Returns overall system health status.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System is healthy", body = HealthResponse),
        (status = 503, description = "System is unhealthy", body = HealthResponse)
    ),
    tag = "Health"
)]
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let db_healthy = state.db.is_healthy().await;
    let uptime = START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0);

    let (status, http_status) = if db_healthy {
        ("healthy", StatusCode::OK)
    } else {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        http_status,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: DatabaseHealth {
                connected: db_healthy,
                db_type: state.db.db_type().to_string(),
                pool_size: state.db.pool_size(),
                idle_connections: state.db.idle_connections(),
            },
            log_feed: LogFeedHealth {
                subscribers: state.feed.subscriber_count(),
                history_size: state.feed.history_size(),
            },
            uptime_seconds: uptime,
        }),
    )
}

/// Readiness check. Ready once the database answers.
#[utoipa::path(
    get,
    path = "/ready",
    responses(
        (status = 200, description = "Ready to serve traffic"),
        (status = 503, description = "Database unavailable")
    ),
    tag = "Health"
)]
async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    if state.db.is_healthy().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Liveness check.
#[utoipa::path(
    get,
    path = "/live",
    responses((status = 200, description = "Process is alive")),
    tag = "Health"
)]
async fn liveness_check() -> StatusCode {
    StatusCode::OK
}
