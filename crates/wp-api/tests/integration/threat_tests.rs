//! Threat tracking tests.

use axum::http::StatusCode;
use serde_json::Value;
use wp_core::Role;

use super::common::{
    assert_error_code, create_incident, create_test_router, get_request, post_json_request,
    put_json_request, put_request, send_request, token_for,
};

async fn create_threat(app: &axum::Router, token: &str, body: &str) -> Value {
    let (status, json): (_, Value) = send_request(
        app.clone(),
        post_json_request("/api/v1/threats", body, Some(token)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", json);
    json
}

#[tokio::test]
async fn test_create_threat_links_incidents() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Analyst).await;

    let incident = create_incident(
        &app,
        &token,
        r#"{"title":"C2 traffic","description":"d","severity":"High","type":"Malware"}"#,
    )
    .await;

    let threat = create_threat(
        &app,
        &token,
        &format!(
            r#"{{"classification":"Botnet","description":"Beacon to known C2","severity":"High","detectionSource":"IDS","relatedIncidents":["{}"]}}"#,
            incident["id"].as_str().unwrap()
        ),
    )
    .await;

    assert_eq!(threat["status"], "Active");
    assert_eq!(threat["detectionSource"], "IDS");
    assert!(threat["detectedAt"].is_string());
    assert!(threat["investigatedBy"].is_null());
    assert_eq!(threat["relatedIncidents"][0]["id"], incident["id"]);
    assert_eq!(threat["relatedIncidents"][0]["title"], "C2 traffic");
}

#[tokio::test]
async fn test_create_threat_requires_severity_and_source() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Analyst).await;

    let (status, json): (_, Value) = send_request(
        app.clone(),
        post_json_request(
            "/api/v1/threats",
            r#"{"classification":"Botnet","description":"d","detectionSource":"IDS"}"#,
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_code(&json, "VALIDATION_ERROR");

    let (status, json): (_, Value) = send_request(
        app,
        post_json_request(
            "/api/v1/threats",
            r#"{"classification":"Botnet","description":"d","severity":"Low"}"#,
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_code(&json, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_critical_threat_alert_is_broadcast() {
    let (app, state) = create_test_router().await;
    let analyst = token_for(&state, Role::Analyst).await;
    let viewer = token_for(&state, Role::Viewer).await;

    let threat = create_threat(
        &app,
        &analyst,
        r#"{"classification":"Ransomware","description":"Mass encryption","severity":"Critical","detectionSource":"EDR"}"#,
    )
    .await;

    for token in [&analyst, &viewer] {
        let (_, alerts): (_, Value) =
            send_request(app.clone(), get_request("/api/v1/alerts", Some(token))).await;
        let alerts = alerts.as_array().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0]["type"], "Threat");
        assert!(alerts[0]["recipientId"].is_null());
        assert_eq!(alerts[0]["relatedResourceId"], threat["id"]);
    }
}

#[tokio::test]
async fn test_investigate_and_resolve() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Analyst).await;

    let threat = create_threat(
        &app,
        &token,
        r#"{"classification":"Brute force","description":"SSH attempts","severity":"Medium","detectionSource":"SIEM"}"#,
    )
    .await;
    let uri = format!("/api/v1/threats/{}", threat["id"].as_str().unwrap());

    let (status, investigated): (_, Value) = send_request(
        app.clone(),
        put_json_request(
            &format!("{}/investigate", uri),
            r#"{"notes":"Source IP blocked"}"#,
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(investigated["status"], "Investigated");
    assert_eq!(investigated["investigationNotes"], "Source IP blocked");
    assert!(investigated["investigatedAt"].is_string());
    assert!(investigated["investigatedBy"]["id"].is_string());

    let (status, resolved): (_, Value) = send_request(
        app.clone(),
        put_request(&format!("{}/resolve", uri), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["status"], "Resolved");

    let (_, fetched): (_, Value) = send_request(app, get_request(&uri, Some(&token))).await;
    assert_eq!(fetched["status"], "Resolved");
    assert_eq!(fetched["investigationNotes"], "Source IP blocked");
}

#[tokio::test]
async fn test_investigate_without_body() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Analyst).await;

    let threat = create_threat(
        &app,
        &token,
        r#"{"classification":"Scan","description":"d","severity":"Low","detectionSource":"Firewall"}"#,
    )
    .await;

    let (status, json): (_, Value) = send_request(
        app,
        put_request(
            &format!("/api/v1/threats/{}/investigate", threat["id"].as_str().unwrap()),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "Investigated");
    assert!(json["investigationNotes"].is_null());
}

#[tokio::test]
async fn test_list_threats_filters_by_status() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Analyst).await;

    let first = create_threat(
        &app,
        &token,
        r#"{"classification":"A","description":"d","severity":"Low","detectionSource":"IDS"}"#,
    )
    .await;
    create_threat(
        &app,
        &token,
        r#"{"classification":"B","description":"d","severity":"High","detectionSource":"IDS"}"#,
    )
    .await;

    send_request::<Value>(
        app.clone(),
        put_request(
            &format!("/api/v1/threats/{}/resolve", first["id"].as_str().unwrap()),
            Some(&token),
        ),
    )
    .await;

    let (_, all): (_, Value) =
        send_request(app.clone(), get_request("/api/v1/threats", Some(&token))).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, active): (_, Value) = send_request(
        app.clone(),
        get_request("/api/v1/threats?status=Active", Some(&token)),
    )
    .await;
    let active = active.as_array().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["classification"], "B");

    let (status, _): (_, Value) = send_request(
        app,
        get_request("/api/v1/threats?status=Dormant", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_threat_is_not_found() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Analyst).await;

    let (status, json): (_, Value) = send_request(
        app,
        put_request(
            "/api/v1/threats/550e8400-e29b-41d4-a716-446655440000/resolve",
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["message"], "Threat not found");
}
