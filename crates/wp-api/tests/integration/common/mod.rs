//! Common test utilities for integration tests.

use axum::{
    body::Body,
    http::{Method, StatusCode},
    Router,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;
use wp_api::{state::AppState, ApiServer};
use wp_core::db::{create_pool, run_migrations, DbPool};
use wp_core::{LogFeed, Role, TokenService};

pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Creates an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> DbPool {
    let db_url = format!(
        "sqlite:file:integration_test_{}?mode=memory&cache=shared",
        Uuid::new_v4()
    );
    let pool = create_pool(&db_url)
        .await
        .expect("Failed to create SQLite pool");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Creates an AppState with test database.
pub async fn create_test_state() -> AppState {
    let db = setup_test_db().await;
    let tokens = TokenService::new("integration-test-secret", chrono::Duration::hours(1));
    AppState::new(db, tokens, Arc::new(LogFeed::default()))
}

/// Creates the full application router with middleware.
pub async fn create_test_router() -> (Router, AppState) {
    let state = create_test_state().await;
    let router = ApiServer::with_state(state.clone()).router();
    (router, state)
}

/// Creates a user with `role` and returns a bearer token for it.
pub async fn token_for(state: &AppState, role: Role) -> String {
    let email = format!("{}-{}@watchpost.test", role, Uuid::new_v4());
    state
        .auth_service()
        .create_user(&email, "Test User", TEST_PASSWORD, role)
        .await
        .expect("Failed to create test user");
    state
        .auth_service()
        .login(&email, TEST_PASSWORD)
        .await
        .expect("Failed to log in test user")
        .token
}

fn builder(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let mut builder = axum::extract::Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    builder
}

/// Helper to make GET requests.
pub fn get_request(uri: &str, token: Option<&str>) -> axum::extract::Request<Body> {
    builder(Method::GET, uri, token)
        .body(Body::empty())
        .unwrap()
}

/// Helper to make POST requests with JSON body.
pub fn post_json_request(
    uri: &str,
    body: &str,
    token: Option<&str>,
) -> axum::extract::Request<Body> {
    builder(Method::POST, uri, token)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Helper to make PUT requests with JSON body.
pub fn put_json_request(
    uri: &str,
    body: &str,
    token: Option<&str>,
) -> axum::extract::Request<Body> {
    builder(Method::PUT, uri, token)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Helper to make PUT requests without a body.
pub fn put_request(uri: &str, token: Option<&str>) -> axum::extract::Request<Body> {
    builder(Method::PUT, uri, token)
        .body(Body::empty())
        .unwrap()
}

/// Helper to make DELETE requests.
pub fn delete_request(uri: &str, token: Option<&str>) -> axum::extract::Request<Body> {
    builder(Method::DELETE, uri, token)
        .body(Body::empty())
        .unwrap()
}

/// Sends request and parses JSON response.
pub async fn send_request<T: DeserializeOwned>(
    app: Router,
    request: axum::extract::Request<Body>,
) -> (StatusCode, T) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let parsed: T = serde_json::from_slice(&body).unwrap_or_else(|e| {
        panic!(
            "Failed to parse response: {} - Body: {:?}",
            e,
            String::from_utf8_lossy(&body)
        )
    });
    (status, parsed)
}

/// Sends request and returns raw response body.
pub async fn send_request_raw(
    app: Router,
    request: axum::extract::Request<Body>,
) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8_lossy(&body).to_string())
}

/// Asserts the error envelope's code.
pub fn assert_error_code(body: &Value, code: &str) {
    assert_eq!(body["error"]["code"], code, "unexpected error body: {}", body);
    assert!(body["error"]["message"].is_string());
}

/// Creates an incident through the API and returns its JSON.
pub async fn create_incident(app: &Router, token: &str, body: &str) -> Value {
    let (status, json): (_, Value) = send_request(
        app.clone(),
        post_json_request("/api/v1/incidents", body, Some(token)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", json);
    json
}
