//! Incident lifecycle tests: creation, listing, updates, deletion, and audit.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::Value;
use wp_core::Role;

use super::common::{
    assert_error_code, create_incident, create_test_router, delete_request, get_request,
    post_json_request, put_json_request, send_request, token_for,
};

#[tokio::test]
async fn test_create_incident_with_explicit_severity() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Analyst).await;

    let json = create_incident(
        &app,
        &token,
        r#"{"title":"Phishing wave","description":"Suspicious emails","severity":"Medium","type":"Phishing","tags":["email"]}"#,
    )
    .await;

    assert_eq!(json["title"], "Phishing wave");
    assert_eq!(json["severity"], "Medium");
    assert_eq!(json["status"], "Open");
    assert_eq!(json["type"], "Phishing");
    assert_eq!(json["tags"][0], "email");
    assert!(json["createdBy"]["email"].is_string());
    assert!(json["resolvedAt"].is_null());
}

#[tokio::test]
async fn test_create_incident_scores_missing_severity() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Analyst).await;

    let json = create_incident(
        &app,
        &token,
        r#"{"title":"Encrypted shares","description":"Ransomware note found on file server","type":"Malware"}"#,
    )
    .await;

    assert_eq!(json["severity"], "Critical");
}

#[tokio::test]
async fn test_create_incident_missing_fields() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Analyst).await;

    let (status, json): (_, Value) = send_request(
        app.clone(),
        post_json_request(
            "/api/v1/incidents",
            r#"{"description":"no title","type":"Malware"}"#,
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_code(&json, "VALIDATION_ERROR");

    let (status, json): (_, Value) = send_request(
        app,
        post_json_request(
            "/api/v1/incidents",
            r#"{"title":"t","description":"d","type":"Malware","severity":"Apocalyptic"}"#,
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_code(&json, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Analyst).await;

    let (status, json): (_, Value) = send_request(
        app,
        post_json_request("/api/v1/incidents", "{not json", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"]["code"].is_string());
}

#[tokio::test]
async fn test_critical_incident_raises_alert_for_creator() {
    let (app, state) = create_test_router().await;
    let creator = token_for(&state, Role::Analyst).await;
    let other = token_for(&state, Role::Analyst).await;

    let incident = create_incident(
        &app,
        &creator,
        r#"{"title":"Domain admin compromise","description":"d","severity":"Critical","type":"Intrusion"}"#,
    )
    .await;

    let (status, alerts): (_, Value) =
        send_request(app.clone(), get_request("/api/v1/alerts", Some(&creator))).await;
    assert_eq!(status, StatusCode::OK);
    let alerts = alerts.as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["type"], "Incident");
    assert_eq!(alerts[0]["title"], "Critical Incident: Domain admin compromise");
    assert_eq!(alerts[0]["relatedResourceId"], incident["id"]);
    assert_eq!(alerts[0]["isRead"], false);

    // Addressed to the creator only.
    let (_, alerts): (_, Value) =
        send_request(app, get_request("/api/v1/alerts", Some(&other))).await;
    assert!(alerts.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_non_critical_incident_raises_no_alert() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Analyst).await;

    create_incident(
        &app,
        &token,
        r#"{"title":"Port scan","description":"d","severity":"High","type":"Recon"}"#,
    )
    .await;

    let (_, alerts): (_, Value) =
        send_request(app, get_request("/api/v1/alerts", Some(&token))).await;
    assert!(alerts.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_incidents_paginates_and_filters() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Analyst).await;

    for (i, severity) in ["Low", "High", "High", "Medium", "Low"].iter().enumerate() {
        create_incident(
            &app,
            &token,
            &format!(
                r#"{{"title":"Incident {}","description":"d","severity":"{}","type":"Misc"}}"#,
                i, severity
            ),
        )
        .await;
    }

    let (status, page): (_, Value) = send_request(
        app.clone(),
        get_request("/api/v1/incidents?page=2&limit=2", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 5);
    assert_eq!(page["page"], 2);
    assert_eq!(page["limit"], 2);
    assert_eq!(page["totalPages"], 3);
    assert_eq!(page["incidents"].as_array().unwrap().len(), 2);

    let (_, high): (_, Value) = send_request(
        app.clone(),
        get_request("/api/v1/incidents?severity=High", Some(&token)),
    )
    .await;
    assert_eq!(high["total"], 2);
    assert!(high["incidents"]
        .as_array()
        .unwrap()
        .iter()
        .all(|i| i["severity"] == "High"));

    let (_, mixed): (_, Value) = send_request(
        app.clone(),
        get_request("/api/v1/incidents?severity=High,Medium", Some(&token)),
    )
    .await;
    assert_eq!(mixed["total"], 3);

    let (status, json): (_, Value) = send_request(
        app,
        get_request("/api/v1/incidents?status=Pending", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_code(&json, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_list_incidents_newest_first() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Analyst).await;

    create_incident(
        &app,
        &token,
        r#"{"title":"older","description":"d","severity":"Low","type":"Misc"}"#,
    )
    .await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    create_incident(
        &app,
        &token,
        r#"{"title":"newer","description":"d","severity":"Low","type":"Misc"}"#,
    )
    .await;

    let (_, page): (_, Value) =
        send_request(app, get_request("/api/v1/incidents", Some(&token))).await;
    assert_eq!(page["incidents"][0]["title"], "newer");
    assert_eq!(page["incidents"][1]["title"], "older");
}

#[tokio::test]
async fn test_limit_is_clamped() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Viewer).await;

    let (status, page): (_, Value) = send_request(
        app,
        get_request("/api/v1/incidents?limit=500", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["limit"], 100);
    assert_eq!(page["totalPages"], 1);
}

#[tokio::test]
async fn test_get_missing_incident_is_not_found() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Viewer).await;

    let (status, json): (_, Value) = send_request(
        app.clone(),
        get_request(
            "/api/v1/incidents/550e8400-e29b-41d4-a716-446655440000",
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_error_code(&json, "NOT_FOUND");
    assert_eq!(json["error"]["message"], "Incident not found");

    let (status, _): (_, Value) = send_request(
        app,
        get_request("/api/v1/incidents/not-a-uuid", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_incident_status_and_audit_trail() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Analyst).await;

    let incident = create_incident(
        &app,
        &token,
        r#"{"title":"Beaconing host","description":"d","severity":"High","type":"Malware"}"#,
    )
    .await;
    let id = incident["id"].as_str().unwrap();
    let uri = format!("/api/v1/incidents/{}", id);

    let request = Request::builder()
        .method(Method::PUT)
        .uri(&uri)
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .header("User-Agent", "watchpost-tests")
        .header("X-Forwarded-For", "10.1.2.3")
        .body(Body::from(r#"{"status":"Resolved","title":"Beaconing host (contained)"}"#))
        .unwrap();
    let (status, updated): (_, Value) = send_request(app.clone(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "Resolved");
    assert_eq!(updated["title"], "Beaconing host (contained)");
    assert!(updated["resolvedAt"].is_string());

    // Reopening is allowed.
    let (status, reopened): (_, Value) = send_request(
        app.clone(),
        put_json_request(&uri, r#"{"status":"in_progress"}"#, Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reopened["status"], "In Progress");

    let (status, history): (_, Value) = send_request(
        app,
        get_request(&format!("{}/history", uri), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);

    let first = &history[1];
    assert_eq!(first["action"], "UPDATE_INCIDENT");
    assert_eq!(first["resourceType"], "Incident");
    assert_eq!(first["status"], "Success");
    assert_eq!(first["ipAddress"], "10.1.2.3");
    assert_eq!(first["userAgent"], "watchpost-tests");
    assert_eq!(first["previousValues"]["status"], "Open");
    assert_eq!(first["newValues"]["status"], "Resolved");
}

#[tokio::test]
async fn test_update_clears_assignee_with_null() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Analyst).await;

    let me: Value = send_request(app.clone(), get_request("/api/v1/auth/me", Some(&token)))
        .await
        .1;
    let incident = create_incident(
        &app,
        &token,
        &format!(
            r#"{{"title":"t","description":"d","severity":"Low","type":"Misc","assignedTo":"{}"}}"#,
            me["id"].as_str().unwrap()
        ),
    )
    .await;
    assert_eq!(incident["assignedTo"]["id"], me["id"]);

    let uri = format!("/api/v1/incidents/{}", incident["id"].as_str().unwrap());
    let (_, unchanged): (_, Value) = send_request(
        app.clone(),
        put_json_request(&uri, r#"{"description":"more detail"}"#, Some(&token)),
    )
    .await;
    assert_eq!(unchanged["assignedTo"]["id"], me["id"]);

    let (_, cleared): (_, Value) = send_request(
        app,
        put_json_request(&uri, r#"{"assignedTo":null}"#, Some(&token)),
    )
    .await;
    assert!(cleared["assignedTo"].is_null());
}

#[tokio::test]
async fn test_update_missing_incident_is_not_found() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Analyst).await;

    let (status, _): (_, Value) = send_request(
        app,
        put_json_request(
            "/api/v1/incidents/550e8400-e29b-41d4-a716-446655440000",
            r#"{"status":"Closed"}"#,
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_incident_keeps_audit_entry() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Analyst).await;

    let incident = create_incident(
        &app,
        &token,
        r#"{"title":"False positive","description":"d","severity":"Info","type":"Misc"}"#,
    )
    .await;
    let uri = format!("/api/v1/incidents/{}", incident["id"].as_str().unwrap());

    let (status, json): (_, Value) =
        send_request(app.clone(), delete_request(&uri, Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Incident deleted");

    let (status, _): (_, Value) =
        send_request(app.clone(), get_request(&uri, Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _): (_, Value) =
        send_request(app.clone(), delete_request(&uri, Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, history): (_, Value) = send_request(
        app,
        get_request(&format!("{}/history", uri), Some(&token)),
    )
    .await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["action"], "DELETE_INCIDENT");
    assert_eq!(history[0]["previousValues"]["title"], "False positive");
    assert!(history[0]["newValues"].is_null());
}

#[tokio::test]
async fn test_viewer_cannot_read_history() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Viewer).await;

    let (status, _): (_, Value) = send_request(
        app,
        get_request(
            "/api/v1/incidents/550e8400-e29b-41d4-a716-446655440000/history",
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_score_endpoint() {
    let (app, state) = create_test_router().await;
    let token = token_for(&state, Role::Viewer).await;

    let (status, json): (_, Value) = send_request(
        app.clone(),
        post_json_request(
            "/api/v1/incidents/score",
            r#"{"description":"possible ransomware on host"}"#,
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["severity"], "Critical");
    assert!(json["rationale"].is_string());

    let (status, json): (_, Value) = send_request(
        app,
        post_json_request("/api/v1/incidents/score", r#"{}"#, Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_code(&json, "VALIDATION_ERROR");
}
