//! Health, metrics, and cross-cutting middleware tests.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;
use wp_api::rate_limit::ApiRateLimiter;
use wp_api::ApiServer;

use super::common::{
    assert_error_code, create_test_router, create_test_state, get_request, send_request,
    send_request_raw,
};

#[tokio::test]
async fn test_health_reports_database_and_feed() {
    let (app, _state) = create_test_router().await;

    let (status, json): (_, Value) = send_request(app, get_request("/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["database"]["connected"], true);
    assert_eq!(json["database"]["dbType"], "sqlite");
    assert_eq!(json["logFeed"]["historySize"], 75);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_ready_and_live() {
    let (app, _state) = create_test_router().await;

    let (status, _) = send_request_raw(app.clone(), get_request("/ready", None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_request_raw(app, get_request("/live", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_unavailable_without_recorder() {
    let (app, _state) = create_test_router().await;

    let (status, body) = send_request_raw(app, get_request("/metrics", None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("not initialized"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (app, _state) = create_test_router().await;

    let (status, _) = send_request_raw(app, get_request("/api/v1/nope", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_request_id_and_security_headers() {
    let (app, _state) = create_test_router().await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .header("X-Request-Id", "req-42")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.headers()["x-request-id"], "req-42");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "DENY");
}

#[tokio::test]
async fn test_openapi_document_served() {
    let (app, _state) = create_test_router().await;

    let (status, json): (_, Value) =
        send_request(app, get_request("/api-docs/openapi.json", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["info"]["title"], "Watchpost API");
}

#[tokio::test]
async fn test_rate_limit_per_client_ip() {
    let state = create_test_state()
        .await
        .with_rate_limiter(ApiRateLimiter::new(2, Duration::from_secs(60)).unwrap());
    let app = ApiServer::with_state(state).router();

    let from = |ip: &str| {
        Request::builder()
            .uri("/api/v1/incidents")
            .header("X-Forwarded-For", ip)
            .body(Body::empty())
            .unwrap()
    };

    // Unauthenticated, but each request still counts against the client.
    for _ in 0..2 {
        let (status, _) = send_request_raw(app.clone(), from("203.0.113.9")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let response = app.clone().oneshot(from("203.0.113.9")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["retry-after"], "60");
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_error_code(&json, "RATE_LIMIT_EXCEEDED");

    // Another client is unaffected, and health checks are exempt.
    let (status, _) = send_request_raw(app.clone(), from("198.51.100.7")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let health = Request::builder()
        .uri("/health")
        .header("X-Forwarded-For", "203.0.113.9")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send_request_raw(app, health).await;
    assert_eq!(status, StatusCode::OK);
}
