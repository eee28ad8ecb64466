//! Authentication and authorization for the API.
//!
//! Requests authenticate with a JWT in `Authorization: Bearer <token>`. The
//! extractors here resolve the token to an active user and enforce role gates.

pub mod extractors;

pub use extractors::{AuthenticatedUser, RequireAdmin, RequireAnalyst};

use axum::http::{header::AUTHORIZATION, HeaderMap};

/// Returns the bearer token from the `Authorization` header, if well formed.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
