//! API routes.

pub mod alerts;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod incidents;
pub mod logs;
pub mod metrics;
pub mod threats;

use crate::state::AppState;
use axum::Router;

/// Creates the main API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes())
        .merge(health::routes())
        .merge(metrics::routes())
        .with_state(state)
}

/// API routes under the /api/v1 prefix.
fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::routes())
        .nest("/incidents", incidents::routes())
        .nest("/threats", threats::routes())
        .nest("/alerts", alerts::routes())
        .nest("/dashboard", dashboard::routes())
        .nest("/logs", logs::routes())
}
