//! Per-IP rate limiting for API requests.
//!
//! Each client IP gets its own governor limiter. Limiters live in an LRU cache
//! so that a flood of distinct IPs cannot grow memory without bound.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header::RETRY_AFTER, Extensions, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use lru::LruCache;
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::{NonZeroU32, NonZeroUsize},
    sync::{Arc, Mutex},
    time::Duration,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// Default requests allowed per window for one IP.
pub const DEFAULT_REQUESTS_PER_WINDOW: u32 = 100;

/// Default rate limit window (15 minutes).
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Default maximum entries in the limiter LRU cache.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Paths that are never rate limited.
const EXEMPT_PATHS: [&str; 4] = ["/health", "/ready", "/live", "/metrics"];

type IpRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("Invalid rate limit configuration: {0}")]
    InvalidConfig(String),

    #[error("Rate limit exceeded")]
    Exceeded,
}

/// Per-IP API rate limiter.
#[derive(Clone)]
pub struct ApiRateLimiter {
    per_ip: Arc<Mutex<LruCache<IpAddr, Arc<IpRateLimiter>>>>,
    quota: Quota,
    requests: u32,
    window: Duration,
}

impl ApiRateLimiter {
    /// Allows `requests` per `window` for each IP, tracking the default
    /// number of IPs.
    pub fn new(requests: u32, window: Duration) -> Result<Self, RateLimitError> {
        Self::with_max_entries(requests, window, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_max_entries(
        requests: u32,
        window: Duration,
        max_entries: usize,
    ) -> Result<Self, RateLimitError> {
        let burst = NonZeroU32::new(requests)
            .ok_or_else(|| RateLimitError::InvalidConfig("requests must be > 0".to_string()))?;
        let cache_size = NonZeroUsize::new(max_entries)
            .ok_or_else(|| RateLimitError::InvalidConfig("max entries must be > 0".to_string()))?;

        // One cell replenishes every window/requests, so a full burst refills
        // over exactly one window.
        let quota = Quota::with_period(window / requests)
            .ok_or_else(|| RateLimitError::InvalidConfig("window must be > 0".to_string()))?
            .allow_burst(burst);

        Ok(Self {
            per_ip: Arc::new(Mutex::new(LruCache::new(cache_size))),
            quota,
            requests,
            window,
        })
    }

    /// Checks whether a request from `ip` is allowed.
    pub fn check_ip(&self, ip: IpAddr) -> Result<(), RateLimitError> {
        let limiter = self.limiter_for(ip);
        if limiter.check().is_err() {
            warn!(
                ip = %ip,
                limit = self.requests,
                window_secs = self.window.as_secs(),
                "Per-IP rate limit exceeded"
            );
            return Err(RateLimitError::Exceeded);
        }
        Ok(())
    }

    fn limiter_for(&self, ip: IpAddr) -> Arc<IpRateLimiter> {
        let mut cache = self.per_ip.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(limiter) = cache.get(&ip) {
            return limiter.clone();
        }

        let limiter = Arc::new(RateLimiter::direct(self.quota));
        if let Some((evicted, _)) = cache.push(ip, limiter.clone()) {
            debug!(evicted = %evicted, "Rate limiter cache evicted least recently used IP");
        }
        limiter
    }

    /// Number of IPs currently tracked.
    pub fn tracked_ips(&self) -> usize {
        self.per_ip.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Window length in whole seconds, for `Retry-After`.
    pub fn window_secs(&self) -> u64 {
        self.window.as_secs()
    }
}

impl Default for ApiRateLimiter {
    fn default() -> Self {
        let quota = Quota::with_period(DEFAULT_WINDOW / DEFAULT_REQUESTS_PER_WINDOW)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(NonZeroU32::new(DEFAULT_REQUESTS_PER_WINDOW).unwrap_or(NonZeroU32::MIN));
        let cache_size = NonZeroUsize::new(DEFAULT_MAX_ENTRIES).unwrap_or(NonZeroUsize::MIN);

        Self {
            per_ip: Arc::new(Mutex::new(LruCache::new(cache_size))),
            quota,
            requests: DEFAULT_REQUESTS_PER_WINDOW,
            window: DEFAULT_WINDOW,
        }
    }
}

/// Resolves the client IP: first `X-Forwarded-For` hop, then the socket peer
/// address, then loopback.
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> IpAddr {
    if let Some(first_hop) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
    {
        if let Ok(ip) = first_hop.trim().parse::<IpAddr>() {
            return ip;
        }
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

/// Middleware that applies per-IP rate limiting to every request except health checks.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path();
    if EXEMPT_PATHS.contains(&path) {
        return next.run(req).await;
    }

    let ip = client_ip(req.headers(), req.extensions());
    if state.rate_limiter.check_ip(ip).is_err() {
        wp_observability::metrics::record_rate_limited();

        let mut response = ApiError::RateLimitExceeded.into_response();
        if let Ok(value) = HeaderValue::from_str(&state.rate_limiter.window_secs().to_string()) {
            response.headers_mut().insert(RETRY_AFTER, value);
        }
        return response;
    }

    next.run(req).await
}
