//! Incident management endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;
use wp_core::db::{IncidentFilter, Pagination};
use wp_core::{assess, IncidentStatus, Severity};
use wp_observability::metrics::{record_alert_created, record_incident_created};

use crate::auth::{AuthenticatedUser, RequireAnalyst};
use crate::dto::{
    parse_list, AuditLogResponse, CreateIncidentRequest, IncidentListResponse, IncidentResponse,
    ListIncidentsQuery, MessageResponse, ScoreRequest, ThreatAssessmentResponse,
    UpdateIncidentRequest,
};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery, ClientContext};
use crate::state::AppState;

/// Creates incident routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_incidents).post(create_incident))
        .route("/score", post(score_incident))
        .route(
            "/:id",
            get(get_incident).put(update_incident).delete(delete_incident),
        )
        .route("/:id/history", get(incident_history))
}

/// List incidents with filtering and pagination.
#[utoipa::path(
    get,
    path = "/api/v1/incidents",
    params(
        ("status" = Option<String>, Query, description = "Filter by status (comma-separated)"),
        ("severity" = Option<String>, Query, description = "Filter by severity (comma-separated)"),
        ("page" = Option<u32>, Query, description = "Page number (1-indexed)"),
        ("limit" = Option<u32>, Query, description = "Items per page (max 100)")
    ),
    responses(
        (status = 200, description = "Page of incidents", body = IncidentListResponse),
        (status = 400, description = "Invalid query parameters", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Incidents"
)]
async fn list_incidents(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    ApiQuery(query): ApiQuery<ListIncidentsQuery>,
) -> Result<Json<IncidentListResponse>, ApiError> {
    query.validate()?;

    let filter = IncidentFilter {
        status: parse_list::<IncidentStatus>("status", query.status.as_deref())?,
        severity: parse_list::<Severity>("severity", query.severity.as_deref())?,
    };
    let pagination = Pagination::from_query(query.page, query.limit);

    let page = state
        .incident_service()
        .list(&filter, &pagination)
        .await?;

    Ok(Json(page.into()))
}

/// Create an incident.
///
/// Severity is scored from the description when omitted. Critical incidents
/// raise an alert for the creator.
#[utoipa::path(
    post,
    path = "/api/v1/incidents",
    request_body = CreateIncidentRequest,
    responses(
        (status = 201, description = "Incident created", body = IncidentResponse),
        (status = 400, description = "Missing or invalid fields", body = crate::error::ErrorResponse),
        (status = 403, description = "Insufficient permissions", body = crate::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Incidents"
)]
async fn create_incident(
    State(state): State<AppState>,
    RequireAnalyst(user): RequireAnalyst,
    ApiJson(request): ApiJson<CreateIncidentRequest>,
) -> Result<(StatusCode, Json<IncidentResponse>), ApiError> {
    request.validate()?;
    let input = request.into_new_incident()?;

    let detail = state.incident_service().create(input, &user).await?;

    let severity = detail.incident.severity;
    record_incident_created(severity.as_str());
    if severity == Severity::Critical {
        record_alert_created("Incident");
    }

    Ok((StatusCode::CREATED, Json(detail.into())))
}

/// Score a description with the keyword heuristic.
#[utoipa::path(
    post,
    path = "/api/v1/incidents/score",
    request_body = ScoreRequest,
    responses(
        (status = 200, description = "Assessment", body = ThreatAssessmentResponse),
        (status = 400, description = "Missing description", body = crate::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Incidents"
)]
async fn score_incident(
    AuthenticatedUser(_user): AuthenticatedUser,
    ApiJson(request): ApiJson<ScoreRequest>,
) -> Result<Json<ThreatAssessmentResponse>, ApiError> {
    request.validate()?;
    Ok(Json(assess(&request.description).into()))
}

/// Get a single incident by ID.
#[utoipa::path(
    get,
    path = "/api/v1/incidents/{id}",
    params(("id" = Uuid, Path, description = "Incident ID")),
    responses(
        (status = 200, description = "Incident", body = IncidentResponse),
        (status = 404, description = "Incident not found", body = crate::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Incidents"
)]
async fn get_incident(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<IncidentResponse>, ApiError> {
    let detail = state.incident_service().get(id).await?;
    Ok(Json(detail.into()))
}

/// Update an incident. Any status may follow any other.
#[utoipa::path(
    put,
    path = "/api/v1/incidents/{id}",
    params(("id" = Uuid, Path, description = "Incident ID")),
    request_body = UpdateIncidentRequest,
    responses(
        (status = 200, description = "Updated incident", body = IncidentResponse),
        (status = 400, description = "Invalid fields", body = crate::error::ErrorResponse),
        (status = 403, description = "Insufficient permissions", body = crate::error::ErrorResponse),
        (status = 404, description = "Incident not found", body = crate::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Incidents"
)]
async fn update_incident(
    State(state): State<AppState>,
    RequireAnalyst(user): RequireAnalyst,
    ClientContext(context): ClientContext,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateIncidentRequest>,
) -> Result<Json<IncidentResponse>, ApiError> {
    request.validate()?;
    let patch = request.into_patch()?;

    let detail = state
        .incident_service()
        .update(id, &patch, &user, &context)
        .await?;

    Ok(Json(detail.into()))
}

/// Delete an incident.
#[utoipa::path(
    delete,
    path = "/api/v1/incidents/{id}",
    params(("id" = Uuid, Path, description = "Incident ID")),
    responses(
        (status = 200, description = "Incident deleted", body = MessageResponse),
        (status = 403, description = "Insufficient permissions", body = crate::error::ErrorResponse),
        (status = 404, description = "Incident not found", body = crate::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Incidents"
)]
async fn delete_incident(
    State(state): State<AppState>,
    RequireAnalyst(user): RequireAnalyst,
    ClientContext(context): ClientContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.incident_service().delete(id, &user, &context).await?;
    Ok(Json(MessageResponse::new("Incident deleted")))
}

/// Audit trail for an incident, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/incidents/{id}/history",
    params(("id" = Uuid, Path, description = "Incident ID")),
    responses(
        (status = 200, description = "Audit entries", body = [AuditLogResponse]),
        (status = 403, description = "Insufficient permissions", body = crate::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Incidents"
)]
async fn incident_history(
    State(state): State<AppState>,
    RequireAnalyst(_user): RequireAnalyst,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<AuditLogResponse>>, ApiError> {
    let entries = state.incident_service().history(id).await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}
