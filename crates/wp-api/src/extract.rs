//! Request extractors that report rejections in the API error envelope.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::{header::USER_AGENT, request::Parts},
};
use std::convert::Infallible;
use wp_core::RequestContext;

use crate::error::ApiError;
use crate::rate_limit::client_ip;

/// JSON body extractor; malformed bodies become 400 `BAD_REQUEST`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor; malformed queries become 400 `BAD_REQUEST`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Path extractor; malformed ids become 400 `BAD_REQUEST`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Client IP and user agent of the current request, for audit entries.
pub struct ClientContext(pub RequestContext);

#[async_trait]
impl<S> FromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(String::from)
            .unwrap_or_else(|| RequestContext::default().user_agent);

        let context = RequestContext {
            ip_address: client_ip(&parts.headers, &parts.extensions).to_string(),
            user_agent,
        };
        Ok(ClientContext(context))
    }
}
