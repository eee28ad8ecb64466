//! Alert inbox and dashboard tests.

use axum::http::StatusCode;
use serde_json::Value;
use wp_core::Role;

use super::common::{
    create_incident, create_test_router, get_request, post_json_request, put_request,
    send_request, token_for,
};

async fn raise_critical(app: &axum::Router, token: &str, title: &str) -> Value {
    create_incident(
        app,
        token,
        &format!(
            r#"{{"title":"{}","description":"d","severity":"Critical","type":"Intrusion"}}"#,
            title
        ),
    )
    .await
}

#[tokio::test]
async fn test_mark_read_and_unread_filter() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Analyst).await;

    raise_critical(&app, &token, "first").await;
    raise_critical(&app, &token, "second").await;

    let (_, alerts): (_, Value) =
        send_request(app.clone(), get_request("/api/v1/alerts", Some(&token))).await;
    let alert_id = alerts[0]["id"].as_str().unwrap().to_string();

    let (status, read): (_, Value) = send_request(
        app.clone(),
        put_request(&format!("/api/v1/alerts/{}/read", alert_id), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["isRead"], true);
    assert!(read["readAt"].is_string());

    let (_, unread): (_, Value) = send_request(
        app,
        get_request("/api/v1/alerts?unreadOnly=true", Some(&token)),
    )
    .await;
    let unread = unread.as_array().unwrap();
    assert_eq!(unread.len(), 1);
    assert_ne!(unread[0]["id"], alert_id.as_str());
}

#[tokio::test]
async fn test_archive_hides_alert_by_default() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Analyst).await;

    raise_critical(&app, &token, "noisy").await;

    let (_, alerts): (_, Value) =
        send_request(app.clone(), get_request("/api/v1/alerts", Some(&token))).await;
    let alert_id = alerts[0]["id"].as_str().unwrap().to_string();

    let (status, archived): (_, Value) = send_request(
        app.clone(),
        put_request(&format!("/api/v1/alerts/{}/archive", alert_id), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(archived["isArchived"], true);

    let (_, visible): (_, Value) =
        send_request(app.clone(), get_request("/api/v1/alerts", Some(&token))).await;
    assert!(visible.as_array().unwrap().is_empty());

    let (_, everything): (_, Value) = send_request(
        app,
        get_request("/api/v1/alerts?includeArchived=true", Some(&token)),
    )
    .await;
    assert_eq!(everything.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_alert_limit() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Analyst).await;

    for title in ["a", "b", "c"] {
        raise_critical(&app, &token, title).await;
    }

    let (_, alerts): (_, Value) = send_request(
        app.clone(),
        get_request("/api/v1/alerts?limit=2", Some(&token)),
    )
    .await;
    assert_eq!(alerts.as_array().unwrap().len(), 2);

    let (status, _): (_, Value) =
        send_request(app, get_request("/api/v1/alerts?limit=0", Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_other_users_alert_is_not_found() {
    let (app, state) = create_test_router().await;
    let owner = token_for(&state, Role::Analyst).await;
    let intruder = token_for(&state, Role::Analyst).await;

    raise_critical(&app, &owner, "private").await;
    let (_, alerts): (_, Value) =
        send_request(app.clone(), get_request("/api/v1/alerts", Some(&owner))).await;
    let alert_id = alerts[0]["id"].as_str().unwrap().to_string();

    let (status, json): (_, Value) = send_request(
        app,
        put_request(&format!("/api/v1/alerts/{}/read", alert_id), Some(&intruder)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["message"], "Alert not found");
}

#[tokio::test]
async fn test_dashboard_metrics() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Analyst).await;

    let critical = raise_critical(&app, &token, "breach").await;
    create_incident(
        &app,
        &token,
        r#"{"title":"scan","description":"d","severity":"Low","type":"Recon"}"#,
    )
    .await;
    send_request::<Value>(
        app.clone(),
        super::common::put_json_request(
            &format!("/api/v1/incidents/{}", critical["id"].as_str().unwrap()),
            r#"{"status":"In Progress"}"#,
            Some(&token),
        ),
    )
    .await;
    send_request::<Value>(
        app.clone(),
        super::common::post_json_request(
            "/api/v1/threats",
            r#"{"classification":"Worm","description":"d","severity":"High","detectionSource":"IDS"}"#,
            Some(&token),
        ),
    )
    .await;

    let (status, metrics): (_, Value) = send_request(
        app,
        get_request("/api/v1/dashboard/metrics", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(metrics["totalIncidents"], 2);
    assert_eq!(metrics["incidentsByStatus"]["open"], 1);
    assert_eq!(metrics["incidentsByStatus"]["inProgress"], 1);
    assert_eq!(metrics["incidentsBySeverity"]["critical"], 1);
    assert_eq!(metrics["incidentsBySeverity"]["low"], 1);
    assert_eq!(metrics["activeThreats"], 1);
    assert_eq!(metrics["recentIncidents"].as_array().unwrap().len(), 2);
    assert_eq!(metrics["recentAlerts"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_dashboard_empty() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Viewer).await;

    let (status, metrics): (_, Value) = send_request(
        app,
        get_request("/api/v1/dashboard/metrics", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(metrics["totalIncidents"], 0);
    assert_eq!(metrics["activeThreats"], 0);
    assert!(metrics["recentIncidents"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_broadcast_archive_only_affects_caller() {
    let (app, state) = create_test_router().await;
    let analyst = token_for(&state, Role::Analyst).await;
    let viewer = token_for(&state, Role::Viewer).await;

    let (status, _): (_, Value) = send_request(
        app.clone(),
        post_json_request(
            "/api/v1/threats",
            r#"{"classification":"Ransomware","description":"d","severity":"Critical","detectionSource":"EDR"}"#,
            Some(&analyst),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, alerts): (_, Value) =
        send_request(app.clone(), get_request("/api/v1/alerts", Some(&viewer))).await;
    let alert_id = alerts[0]["id"].as_str().unwrap().to_string();
    assert!(alerts[0]["recipientId"].is_null());

    for action in ["read", "archive"] {
        let (status, _): (_, Value) = send_request(
            app.clone(),
            put_request(
                &format!("/api/v1/alerts/{}/{}", alert_id, action),
                Some(&viewer),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, viewer_inbox): (_, Value) =
        send_request(app.clone(), get_request("/api/v1/alerts", Some(&viewer))).await;
    assert!(viewer_inbox.as_array().unwrap().is_empty());

    let (_, analyst_unread): (_, Value) = send_request(
        app.clone(),
        get_request("/api/v1/alerts?unreadOnly=true", Some(&analyst)),
    )
    .await;
    let analyst_unread = analyst_unread.as_array().unwrap();
    assert_eq!(analyst_unread.len(), 1);
    assert_eq!(analyst_unread[0]["id"], alert_id.as_str());
    assert_eq!(analyst_unread[0]["isArchived"], false);

    let (_, metrics): (_, Value) = send_request(
        app,
        get_request("/api/v1/dashboard/metrics", Some(&analyst)),
    )
    .await;
    assert_eq!(metrics["recentAlerts"].as_array().unwrap().len(), 1);
}
