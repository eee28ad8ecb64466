//! Log feed tests.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use wp_core::{LogEntry, LogLevel, Role};

use super::common::{
    create_incident, create_test_router, get_request, send_request, send_request_raw, token_for,
};

#[tokio::test]
async fn test_recent_logs_include_service_events() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Analyst).await;

    create_incident(
        &app,
        &token,
        r#"{"title":"Data exfil","description":"d","severity":"High","type":"Exfiltration"}"#,
    )
    .await;

    let (status, logs): (_, Value) =
        send_request(app, get_request("/api/v1/logs/recent", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    let logs = logs.as_array().unwrap();
    assert!(logs
        .iter()
        .any(|entry| entry["message"].as_str().unwrap().contains("Data exfil")));
    assert!(logs.iter().all(|entry| entry["timestamp"].is_string()));
}

#[tokio::test]
async fn test_recent_logs_limit_keeps_newest() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Viewer).await;

    for i in 0..5 {
        state
            .feed
            .publish(LogEntry::new(LogLevel::Warn, format!("event {}", i)))
            .await;
    }

    let (_, logs): (_, Value) = send_request(
        app.clone(),
        get_request("/api/v1/logs/recent?limit=2", Some(&token)),
    )
    .await;
    let messages: Vec<&str> = logs
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["message"].as_str().unwrap())
        .collect();
    assert_eq!(messages.last(), Some(&"event 4"));
    assert_eq!(messages.len(), 2);
    assert_eq!(logs[0]["level"], "warn");

    let (status, _) = send_request_raw(
        app,
        get_request("/api/v1/logs/recent?limit=0", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stream_requires_token() {
    let (app, _state) = create_test_router().await;

    let (status, body): (_, Value) =
        send_request(app.clone(), get_request("/api/v1/logs/stream", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "No token provided");

    let (status, body): (_, Value) = send_request(
        app,
        get_request("/api/v1/logs/stream?token=garbage", None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "Invalid token");
}

#[tokio::test]
async fn test_stream_with_valid_token_requires_upgrade() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Viewer).await;

    // Authenticated, but a plain GET is not a WebSocket handshake.
    let request = Request::builder()
        .uri(format!("/api/v1/logs/stream?token={}", token))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send_request_raw(app, request).await;
    assert_ne!(status, StatusCode::UNAUTHORIZED);
    assert!(status.is_client_error());
}

type ClientSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Serves `app` on an ephemeral local port.
async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .unwrap();
    });
    addr
}

/// Next text frame, decoded as JSON.
async fn next_entry(ws: &mut ClientSocket) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a log frame")
            .expect("stream ended")
            .expect("websocket error");
        if let WsMessage::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

fn assert_entry_shape(entry: &Value) {
    assert!(entry["timestamp"].is_string(), "{}", entry);
    assert!(entry["level"].is_string(), "{}", entry);
    assert!(entry["message"].is_string(), "{}", entry);
}

#[tokio::test]
async fn test_stream_replays_history_then_forwards_live_entries() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Viewer).await;
    state.feed.publish(LogEntry::new(LogLevel::Warn, "replayed entry")).await;

    let addr = serve(app).await;
    let url = format!("ws://{}/api/v1/logs/stream?token={}", addr, token);
    let (mut ws, response) = connect_async(url).await.unwrap();
    assert_eq!(response.status().as_u16(), 101);

    // Earlier service events may precede the entry published above.
    let replayed = loop {
        let entry = next_entry(&mut ws).await;
        assert_entry_shape(&entry);
        if entry["message"] == "replayed entry" {
            break entry;
        }
    };
    assert_eq!(replayed["level"], "warn");

    state.feed.publish(LogEntry::new(LogLevel::Critical, "live entry").with_source("EDR")).await;
    let live = next_entry(&mut ws).await;
    assert_entry_shape(&live);
    assert_eq!(live["message"], "live entry");
    assert_eq!(live["level"], "critical");
    assert_eq!(live["source"], "EDR");

    assert_eq!(state.feed.subscriber_count(), 1);
    ws.close(None).await.unwrap();

    for _ in 0..100 {
        if state.feed.subscriber_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(state.feed.subscriber_count(), 0);
}

#[tokio::test]
async fn test_stream_accepts_bearer_header() {
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;

    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Analyst).await;
    state.feed.publish(LogEntry::new(LogLevel::Info, "header auth")).await;

    let addr = serve(app).await;
    let mut request = format!("ws://{}/api/v1/logs/stream", addr)
        .into_client_request()
        .unwrap();
    request
        .headers_mut()
        .insert("authorization", format!("Bearer {}", token).parse().unwrap());
    let (mut ws, _) = connect_async(request).await.unwrap();

    loop {
        let entry = next_entry(&mut ws).await;
        if entry["message"] == "header auth" {
            break;
        }
    }
}
