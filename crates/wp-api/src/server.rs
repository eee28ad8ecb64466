//! API server implementation.

use axum::{middleware, Router};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[allow(unused_imports)]
use crate::dto::*;
use crate::error::{ErrorBody, ErrorResponse};
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::rate_limit::rate_limit_middleware;
use crate::routes;
use crate::state::AppState;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Address to bind to.
    pub bind_address: SocketAddr,
    /// Enable Swagger UI.
    pub enable_swagger: bool,
    /// Origins allowed by CORS. `*` allows any.
    pub cors_origins: Vec<String>,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            enable_swagger: true,
            cors_origins: vec!["http://localhost:4200".to_string()],
        }
    }
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health_check,
        crate::routes::health::readiness_check,
        crate::routes::health::liveness_check,
        crate::routes::auth::login,
        crate::routes::auth::register,
        crate::routes::auth::logout,
        crate::routes::auth::me,
        crate::routes::incidents::list_incidents,
        crate::routes::incidents::create_incident,
        crate::routes::incidents::score_incident,
        crate::routes::incidents::get_incident,
        crate::routes::incidents::update_incident,
        crate::routes::incidents::delete_incident,
        crate::routes::incidents::incident_history,
        crate::routes::threats::list_threats,
        crate::routes::threats::create_threat,
        crate::routes::threats::get_threat,
        crate::routes::threats::investigate_threat,
        crate::routes::threats::resolve_threat,
        crate::routes::alerts::list_alerts,
        crate::routes::alerts::mark_read,
        crate::routes::alerts::archive_alert,
        crate::routes::dashboard::dashboard_metrics,
        crate::routes::logs::recent_logs,
        crate::routes::logs::stream_logs,
        crate::routes::metrics::prometheus_metrics,
    ),
    components(
        schemas(
            HealthResponse,
            DatabaseHealth,
            LogFeedHealth,
            MessageResponse,
            UserResponse,
            LoginRequest,
            RegisterRequest,
            LoginResponseDto,
            CreateIncidentRequest,
            UpdateIncidentRequest,
            IncidentResponse,
            IncidentListResponse,
            IncidentSummaryResponse,
            ScoreRequest,
            ThreatAssessmentResponse,
            AuditLogResponse,
            CreateThreatRequest,
            InvestigateRequest,
            ThreatResponse,
            AlertResponse,
            StatusCountsResponse,
            SeverityCountsResponse,
            DashboardMetricsResponse,
            LogEntryResponse,
            ErrorResponse,
            ErrorBody,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Auth", description = "Login, registration, and session"),
        (name = "Incidents", description = "Incident management and audit trail"),
        (name = "Threats", description = "Threat tracking"),
        (name = "Alerts", description = "Per-user alert inbox"),
        (name = "Dashboard", description = "Dashboard summary"),
        (name = "Logs", description = "Live log feed"),
        (name = "Metrics", description = "Prometheus metrics"),
    ),
    info(
        title = "Watchpost API",
        version = "0.1.0",
        description = "Security operations dashboard API",
        license(name = "MIT"),
    )
)]
pub struct ApiDoc;

/// API server.
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
}

impl ApiServer {
    /// Creates a new API server.
    pub fn new(state: AppState, config: ApiServerConfig) -> Self {
        Self { config, state }
    }

    /// Creates a new API server with default configuration.
    pub fn with_state(state: AppState) -> Self {
        Self::new(state, ApiServerConfig::default())
    }

    /// Builds the router.
    pub fn router(&self) -> Router {
        routes::health::init_start_time();

        let mut app = routes::create_router(self.state.clone());

        if self.config.enable_swagger {
            app = app.merge(
                SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
            );
        }

        // Innermost first.
        app.layer(middleware::from_fn_with_state(
            self.state.clone(),
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&self.config.cors_origins))
        .layer(CatchPanicLayer::new())
    }

    /// Runs the server until Ctrl+C or SIGTERM.
    pub async fn run(self) -> Result<(), std::io::Error> {
        self.run_until(shutdown_signal()).await
    }

    /// Runs the server with a custom shutdown signal.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let addr = self.config.bind_address;

        info!("Starting API server on {}", addr);

        let listener = TcpListener::bind(addr).await?;

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        info!("API server shut down gracefully");
        Ok(())
    }
}

/// Default shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
