//! Authentication and authorization tests.
//!
//! These tests cover login and registration, and verify that protected
//! endpoints reject unauthenticated requests and enforce role gates.

use axum::http::{Method, Request, StatusCode};
use axum::body::Body;
use serde_json::Value;
use wp_core::Role;

use super::common::{
    assert_error_code, create_test_router, get_request, post_json_request, send_request,
    token_for, TEST_PASSWORD,
};

// ============================================================
// Login / Register
// ============================================================

#[tokio::test]
async fn test_register_then_login() {
    let (app, _state) = create_test_router().await;

    let (status, user): (_, Value) = send_request(
        app.clone(),
        post_json_request(
            "/api/v1/auth/register",
            r#"{"email":"Jo@Example.com","name":"Jo","password":"hunter22"}"#,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["email"], "jo@example.com");
    assert_eq!(user["role"], "Analyst");
    assert!(user.get("passwordHash").is_none());

    let (status, login): (_, Value) = send_request(
        app.clone(),
        post_json_request(
            "/api/v1/auth/login",
            r#"{"email":"jo@example.com","password":"hunter22"}"#,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = login["token"].as_str().unwrap().to_string();
    assert!(login["expiresAt"].is_string());

    let (status, me): (_, Value) =
        send_request(app, get_request("/api/v1/auth/me", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "Jo");
}

#[tokio::test]
async fn test_register_duplicate_email_rejected() {
    let (app, _state) = create_test_router().await;
    let body = r#"{"email":"dup@example.com","name":"Dup","password":"pw123456"}"#;

    let (status, _): (_, Value) = send_request(
        app.clone(),
        post_json_request("/api/v1/auth/register", body, None),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json): (_, Value) =
        send_request(app, post_json_request("/api/v1/auth/register", body, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["message"], "User already exists");
}

#[tokio::test]
async fn test_login_wrong_password_is_unauthorized() {
    let (app, state) = create_test_router().await;
    state
        .auth_service()
        .create_user("ana@example.com", "Ana", TEST_PASSWORD, Role::Analyst)
        .await
        .unwrap();

    let (status, json): (_, Value) = send_request(
        app.clone(),
        post_json_request(
            "/api/v1/auth/login",
            r#"{"email":"ana@example.com","password":"wrong"}"#,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_error_code(&json, "UNAUTHORIZED");
    assert_eq!(json["error"]["message"], "Invalid credentials");

    // Unknown email gets the same answer.
    let (status, json): (_, Value) = send_request(
        app,
        post_json_request(
            "/api/v1/auth/login",
            r#"{"email":"nobody@example.com","password":"wrong"}"#,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["message"], "Invalid credentials");
}

#[tokio::test]
async fn test_login_missing_fields_is_validation_error() {
    let (app, _state) = create_test_router().await;

    let (status, json): (_, Value) = send_request(
        app,
        post_json_request("/api/v1/auth/login", r#"{"email":"a@b.c"}"#, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_code(&json, "VALIDATION_ERROR");
    assert_eq!(json["error"]["message"], "Email and password required");
}

#[tokio::test]
async fn test_logout_acknowledges() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Viewer).await;

    let (status, json): (_, Value) = send_request(
        app,
        post_json_request("/api/v1/auth/logout", "{}", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Logged out successfully");
}

// ============================================================
// Token checks
// ============================================================

#[tokio::test]
async fn test_protected_endpoints_require_token() {
    let (app, _state) = create_test_router().await;

    for uri in [
        "/api/v1/incidents",
        "/api/v1/threats",
        "/api/v1/alerts",
        "/api/v1/dashboard/metrics",
        "/api/v1/logs/recent",
        "/api/v1/auth/me",
    ] {
        let (status, json): (_, Value) = send_request(app.clone(), get_request(uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(json["error"]["message"], "No token provided");
    }
}

#[tokio::test]
async fn test_invalid_token_rejected() {
    let (app, _state) = create_test_router().await;

    let (status, json): (_, Value) = send_request(
        app,
        get_request("/api/v1/incidents", Some("not.a.jwt")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["message"], "Invalid token");
}

#[tokio::test]
async fn test_non_bearer_scheme_is_treated_as_missing() {
    let (app, _state) = create_test_router().await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1/incidents")
        .header("Authorization", "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();
    let (status, json): (_, Value) = send_request(app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["message"], "No token provided");
}

// ============================================================
// Role gates
// ============================================================

#[tokio::test]
async fn test_viewer_cannot_create_incident() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Viewer).await;

    let (status, json): (_, Value) = send_request(
        app,
        post_json_request(
            "/api/v1/incidents",
            r#"{"title":"t","description":"d","type":"Malware"}"#,
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_error_code(&json, "FORBIDDEN");
    assert_eq!(json["error"]["message"], "Insufficient permissions");
}

#[tokio::test]
async fn test_viewer_can_read_incidents() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Viewer).await;

    let (status, json): (_, Value) =
        send_request(app, get_request("/api/v1/incidents", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 0);
}

#[tokio::test]
async fn test_viewer_cannot_create_threat() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Viewer).await;

    let (status, _): (_, Value) = send_request(
        app,
        post_json_request(
            "/api/v1/threats",
            r#"{"classification":"Botnet","description":"d","severity":"Low","detectionSource":"IDS"}"#,
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
