//! Threat tracking endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;
use wp_core::db::ThreatFilter;
use wp_core::{Severity, ThreatStatus};
use wp_observability::metrics::{record_alert_created, record_threat_created};

use crate::auth::{AuthenticatedUser, RequireAnalyst};
use crate::dto::{
    parse_list, CreateThreatRequest, InvestigateRequest, ListThreatsQuery, ThreatResponse,
};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

/// Creates threat routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_threats).post(create_threat))
        .route("/:id", get(get_threat))
        .route("/:id/investigate", put(investigate_threat))
        .route("/:id/resolve", put(resolve_threat))
}

/// List threats, most recently detected first.
#[utoipa::path(
    get,
    path = "/api/v1/threats",
    params(
        ("status" = Option<String>, Query, description = "Filter by status (comma-separated)"),
        ("severity" = Option<String>, Query, description = "Filter by severity (comma-separated)")
    ),
    responses(
        (status = 200, description = "Threats", body = [ThreatResponse]),
        (status = 400, description = "Invalid filter", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Threats"
)]
async fn list_threats(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    ApiQuery(query): ApiQuery<ListThreatsQuery>,
) -> Result<Json<Vec<ThreatResponse>>, ApiError> {
    query.validate()?;

    let filter = ThreatFilter {
        status: parse_list::<ThreatStatus>("status", query.status.as_deref())?,
        severity: parse_list::<Severity>("severity", query.severity.as_deref())?,
    };

    let threats = state.threat_service().list(&filter).await?;
    Ok(Json(threats.into_iter().map(Into::into).collect()))
}

/// Record a detected threat. Critical threats raise a broadcast alert.
#[utoipa::path(
    post,
    path = "/api/v1/threats",
    request_body = CreateThreatRequest,
    responses(
        (status = 201, description = "Threat recorded", body = ThreatResponse),
        (status = 400, description = "Missing or invalid fields", body = crate::error::ErrorResponse),
        (status = 403, description = "Insufficient permissions", body = crate::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Threats"
)]
async fn create_threat(
    State(state): State<AppState>,
    RequireAnalyst(_user): RequireAnalyst,
    ApiJson(request): ApiJson<CreateThreatRequest>,
) -> Result<(StatusCode, Json<ThreatResponse>), ApiError> {
    request.validate()?;
    let input = request.into_new_threat()?;

    let detail = state.threat_service().create(input).await?;

    let severity = detail.threat.severity;
    record_threat_created(severity.as_str());
    if severity == Severity::Critical {
        record_alert_created("Threat");
    }

    Ok((StatusCode::CREATED, Json(detail.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/threats/{id}",
    params(("id" = Uuid, Path, description = "Threat ID")),
    responses(
        (status = 200, description = "Threat", body = ThreatResponse),
        (status = 404, description = "Threat not found", body = crate::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Threats"
)]
async fn get_threat(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ThreatResponse>, ApiError> {
    let detail = state.threat_service().get(id).await?;
    Ok(Json(detail.into()))
}

/// Mark a threat as under investigation. The body is optional.
#[utoipa::path(
    put,
    path = "/api/v1/threats/{id}/investigate",
    params(("id" = Uuid, Path, description = "Threat ID")),
    request_body(content = InvestigateRequest, description = "Optional investigation notes"),
    responses(
        (status = 200, description = "Threat under investigation", body = ThreatResponse),
        (status = 403, description = "Insufficient permissions", body = crate::error::ErrorResponse),
        (status = 404, description = "Threat not found", body = crate::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Threats"
)]
async fn investigate_threat(
    State(state): State<AppState>,
    RequireAnalyst(user): RequireAnalyst,
    ApiPath(id): ApiPath<Uuid>,
    body: Option<ApiJson<InvestigateRequest>>,
) -> Result<Json<ThreatResponse>, ApiError> {
    let request = body.map(|ApiJson(r)| r).unwrap_or_default();
    request.validate()?;

    let detail = state
        .threat_service()
        .investigate(id, request.notes, &user)
        .await?;

    Ok(Json(detail.into()))
}

#[utoipa::path(
    put,
    path = "/api/v1/threats/{id}/resolve",
    params(("id" = Uuid, Path, description = "Threat ID")),
    responses(
        (status = 200, description = "Threat resolved", body = ThreatResponse),
        (status = 403, description = "Insufficient permissions", body = crate::error::ErrorResponse),
        (status = 404, description = "Threat not found", body = crate::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Threats"
)]
async fn resolve_threat(
    State(state): State<AppState>,
    RequireAnalyst(user): RequireAnalyst,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ThreatResponse>, ApiError> {
    let detail = state.threat_service().resolve(id, &user).await?;
    Ok(Json(detail.into()))
}
