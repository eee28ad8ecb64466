//! Application state shared across handlers.

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tracing::info;
use wp_core::db::{DbPool, Repositories};
use wp_core::services::{
    AlertService, AuthService, DashboardService, IncidentService, ThreatService,
};
use wp_core::{LogFeed, TokenService};

use crate::rate_limit::ApiRateLimiter;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DbPool>,
    /// Repositories over the pool.
    pub repos: Repositories,
    /// JWT issuing and verification.
    pub tokens: TokenService,
    /// Live log feed streamed to WebSocket clients.
    pub feed: Arc<LogFeed>,
    /// Per-IP request rate limiter.
    pub rate_limiter: ApiRateLimiter,
    /// Prometheus metrics handle for rendering metrics.
    pub prometheus_handle: Option<Arc<PrometheusHandle>>,
}

impl AppState {
    /// Creates a new application state backed by the given pool.
    pub fn new(db: DbPool, tokens: TokenService, feed: Arc<LogFeed>) -> Self {
        let repos = Repositories::from_pool(&db);
        info!(db_type = db.db_type(), "Application state initialized");

        Self {
            db: Arc::new(db),
            repos,
            tokens,
            feed,
            rate_limiter: ApiRateLimiter::default(),
            prometheus_handle: None,
        }
    }

    /// Replaces the default rate limiter.
    pub fn with_rate_limiter(mut self, limiter: ApiRateLimiter) -> Self {
        self.rate_limiter = limiter;
        self
    }

    /// Creates a new application state with Prometheus handle.
    pub fn with_prometheus_handle(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus_handle = Some(Arc::new(handle));
        self
    }

    pub fn auth_service(&self) -> AuthService {
        AuthService::new(
            self.repos.users.clone(),
            self.tokens.clone(),
            self.feed.clone(),
        )
    }

    pub fn incident_service(&self) -> IncidentService {
        IncidentService::new(self.repos.clone(), self.feed.clone())
    }

    pub fn threat_service(&self) -> ThreatService {
        ThreatService::new(self.repos.clone(), self.feed.clone())
    }

    pub fn alert_service(&self) -> AlertService {
        AlertService::new(self.repos.clone())
    }

    pub fn dashboard_service(&self) -> DashboardService {
        DashboardService::new(self.repos.clone())
    }
}
