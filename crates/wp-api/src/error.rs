//! API error types and handling.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;
use wp_core::db::DbError;
use wp_core::ServiceError;

/// Message returned to clients for any 5xx error.
const GENERIC_SERVER_ERROR: &str = "Internal server error";

/// API error type.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Malformed request (bad JSON, query string, or path id).
    #[error("{0}")]
    BadRequest(String),

    /// Validation error with optional field-level details.
    #[error("{}", .0.message)]
    ValidationError(ValidationErrorDetails),

    /// Missing or invalid authentication.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed.
    #[error("{0}")]
    Forbidden(String),

    /// Account is not active.
    #[error("Account is disabled")]
    AccountDisabled,

    /// Rate limit exceeded.
    #[error("Too many requests, please try again later")]
    RateLimitExceeded,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

/// Details for validation errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetails {
    /// Overall validation error message.
    pub message: String,
    /// Field-specific errors. Empty when the failure is not tied to a field.
    pub fields: HashMap<String, Vec<FieldError>>,
}

/// A single field validation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldError {
    /// Error code (e.g., "required", "length", "email").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional error parameters (e.g., min length).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl ValidationErrorDetails {
    /// Creates a validation error that is not tied to a specific field.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fields: HashMap::new(),
        }
    }

    /// Creates a validation error with a single field error.
    pub fn field(field: &str, code: &str, message: &str) -> Self {
        let mut details = Self::message(message);
        details.add_error(field, code, message);
        details
    }

    /// Creates a validation error from multiple field errors.
    pub fn from_fields(errors: HashMap<String, Vec<FieldError>>) -> Self {
        let message = match errors.keys().next() {
            Some(field) if errors.len() == 1 => format!("Validation failed for field '{}'", field),
            _ => format!("Validation failed for {} fields", errors.len()),
        };
        Self {
            message,
            fields: errors,
        }
    }

    /// Adds a field error.
    pub fn add_error(&mut self, field: &str, code: &str, message: &str) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(FieldError {
                code: code.to_string(),
                message: message.to_string(),
                params: None,
            });
    }
}

/// Error envelope: `{ "error": { code, message, details? } }`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional error details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::AccountDisabled => StatusCode::FORBIDDEN,
            ApiError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::AccountDisabled => "ACCOUNT_DISABLED",
            ApiError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ApiError::Internal(_) | ApiError::Database(_) => "SERVER_ERROR",
        }
    }

    /// Creates a validation error for a single field.
    pub fn validation_field(field: &str, code: &str, message: &str) -> Self {
        ApiError::ValidationError(ValidationErrorDetails::field(field, code, message))
    }

    /// Creates a validation error not tied to a field.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::ValidationError(ValidationErrorDetails::message(message))
    }

    /// Builds the response envelope for this error.
    pub fn to_body(&self) -> ErrorResponse {
        let (message, details) = match self {
            ApiError::ValidationError(details) if !details.fields.is_empty() => (
                details.message.clone(),
                Some(serde_json::to_value(&details.fields).unwrap_or_default()),
            ),
            ApiError::Internal(_) | ApiError::Database(_) => {
                (GENERIC_SERVER_ERROR.to_string(), None)
            }
            _ => (self.to_string(), None),
        };

        ErrorResponse {
            error: ErrorBody {
                code: self.error_code().to_string(),
                message,
                details,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed with server error");
        }
        (status, Json(self.to_body())).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(_) => ApiError::NotFound(err.to_string()),
            ServiceError::Validation(msg) => ApiError::validation(msg),
            ServiceError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid credentials".to_string())
            }
            ServiceError::UserExists => ApiError::BadRequest(err.to_string()),
            ServiceError::InvalidToken => ApiError::Unauthorized("Invalid token".to_string()),
            ServiceError::AccountDisabled => ApiError::AccountDisabled,
            ServiceError::Password(_) | ServiceError::Token(_) => {
                ApiError::Internal(err.to_string())
            }
            ServiceError::Db(db) => db.into(),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, .. } => ApiError::NotFound(format!("{} not found", entity)),
            DbError::Duplicate(msg) => ApiError::BadRequest(msg),
            err => ApiError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut fields: HashMap<String, Vec<FieldError>> = HashMap::new();

        for (field_name, field_errors) in err.field_errors() {
            let errors: Vec<FieldError> = field_errors
                .iter()
                .map(|e| {
                    let code = e.code.to_string();
                    let message = e.message.clone().map(|m| m.to_string()).unwrap_or_else(|| {
                        format!("Field '{}' failed validation: {}", field_name, code)
                    });
                    let params = if e.params.is_empty() {
                        None
                    } else {
                        Some(serde_json::to_value(&e.params).unwrap_or_default())
                    };
                    FieldError {
                        code,
                        message,
                        params,
                    }
                })
                .collect();
            fields.insert(field_name.to_string(), errors);
        }

        ApiError::ValidationError(ValidationErrorDetails::from_fields(fields))
    }
}
