//! Live log feed: recent history over HTTP and a WebSocket stream.

use axum::{
    async_trait,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        FromRef, FromRequestParts, Query, State,
    },
    http::request::Parts,
    response::Response,
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use validator::Validate;
use wp_core::{LogEntry, LogFeed, User};
use wp_observability::metrics::{log_stream_connected, log_stream_disconnected};

use crate::auth::bearer_token;
use crate::auth::extractors::authenticate_token;
use crate::auth::AuthenticatedUser;
use crate::dto::{LogEntryResponse, RecentLogsQuery};
use crate::error::ApiError;
use crate::extract::ApiQuery;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/recent", get(recent_logs))
        .route("/stream", get(stream_logs))
}

/// Retained feed entries, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/logs/recent",
    params(("limit" = Option<usize>, Query, description = "Newest N entries only")),
    responses(
        (status = 200, description = "Recent log entries", body = [LogEntryResponse]),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Logs"
)]
async fn recent_logs(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    ApiQuery(query): ApiQuery<RecentLogsQuery>,
) -> Result<Json<Vec<LogEntryResponse>>, ApiError> {
    query.validate()?;
    let entries = state.feed.recent(query.limit).await;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Default, Deserialize)]
struct StreamParams {
    token: Option<String>,
}

/// Authenticates a stream subscriber.
///
/// Browsers cannot set headers on a WebSocket handshake, so the token may
/// also arrive as the `token` query parameter.
struct StreamUser(User);

#[async_trait]
impl<S> FromRequestParts<S> for StreamUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let params = Query::<StreamParams>::try_from_uri(&parts.uri)
            .map(|Query(p)| p)
            .unwrap_or_default();

        let token = params
            .token
            .filter(|t| !t.is_empty())
            .or_else(|| bearer_token(&parts.headers).map(String::from))
            .ok_or_else(|| ApiError::Unauthorized("No token provided".to_string()))?;

        let user = authenticate_token(&app_state, &token).await?;
        Ok(StreamUser(user))
    }
}

/// Upgrade to a WebSocket that replays history, then forwards new entries.
#[utoipa::path(
    get,
    path = "/api/v1/logs/stream",
    params(("token" = Option<String>, Query, description = "Session token, if not sent as a bearer header")),
    responses(
        (status = 101, description = "Switching to WebSocket"),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorResponse)
    ),
    tag = "Logs"
)]
async fn stream_logs(
    State(state): State<AppState>,
    StreamUser(user): StreamUser,
    ws: WebSocketUpgrade,
) -> Response {
    let feed = state.feed.clone();
    info!(user_id = %user.id, "Log stream client connecting");
    ws.on_upgrade(move |socket| forward_feed(socket, feed))
}

fn encode(entry: LogEntry) -> Option<Message> {
    match serde_json::to_string(&LogEntryResponse::from(entry)) {
        Ok(text) => Some(Message::Text(text)),
        Err(e) => {
            warn!(error = %e, "Failed to encode log entry");
            None
        }
    }
}

async fn forward_feed(socket: WebSocket, feed: Arc<LogFeed>) {
    log_stream_connected();
    let (mut sender, mut receiver) = socket.split();

    let (history, mut rx) = feed.subscribe_with_history().await;

    for entry in history {
        if let Some(message) = encode(entry) {
            if sender.send(message).await.is_err() {
                log_stream_disconnected();
                return;
            }
        }
    }

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Ok(entry) => {
                    let Some(message) = encode(entry) else { continue };
                    if sender.send(message).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Log stream client lagged");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }

    log_stream_disconnected();
    debug!("Log stream client disconnected");
}
