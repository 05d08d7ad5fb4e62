use actix_web::{error, http::StatusCode, HttpRequest, HttpResponse};
use validator::ValidationErrors;

use crate::models::ErrorResponse;
use crate::services::{AuthError, PostgresError, SupabaseError};

/// Error returned by every handler, rendered as the JSON error envelope
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, error: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            error: error.to_string(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for ApiError {}

impl error::ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status).json(ErrorResponse {
            error: self.error.clone(),
            message: self.message.clone(),
            status_code: self.status.as_u16(),
        })
    }
}

impl From<PostgresError> for ApiError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::NotFound(what) => ApiError::not_found(format!("{} not found", what)),
            PostgresError::Conflict(message) => ApiError::new(StatusCode::CONFLICT, "conflict", message),
            PostgresError::Forbidden(message) => ApiError::forbidden(message),
            PostgresError::InvalidInput(message) => ApiError::bad_request(message),
            other => {
                tracing::error!("Database failure: {}", other);
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "database_error", "A database error occurred")
            }
        }
    }
}

impl From<SupabaseError> for ApiError {
    fn from(err: SupabaseError) -> Self {
        match err {
            SupabaseError::InvalidProvince(id) => ApiError::bad_request(format!("Invalid province id: {}", id)),
            other => {
                tracing::error!("Geo directory failure: {}", other);
                ApiError::new(StatusCode::BAD_GATEWAY, "upstream_error", "Geographic directory unavailable")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::unauthorized(err.to_string()),
            AuthError::MissingToken => ApiError::unauthorized(err.to_string()),
            AuthError::InvalidToken(e) => {
                tracing::debug!("Rejected token: {}", e);
                ApiError::unauthorized("Invalid or expired token")
            }
            AuthError::Forbidden(message) => ApiError::forbidden(message),
            AuthError::Hashing => ApiError::internal(err.to_string()),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, "validation_failed", errors.to_string())
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    ApiError::new(StatusCode::BAD_REQUEST, "invalid_json", format!("Invalid JSON: {}", err)).into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("Query payload error on {}: {}", req.path(), err);
    ApiError::new(StatusCode::BAD_REQUEST, "invalid_query", format!("Invalid query: {}", err)).into()
}

/// Handle path parameter errors (e.g. a malformed UUID)
pub fn handle_path_error(err: error::PathError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::new(StatusCode::BAD_REQUEST, "invalid_path", format!("Invalid path: {}", err)).into()
}

/// Reject content that is empty once trimmed
pub fn require_non_blank(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "validation_failed",
            format!("{} must not be blank", field),
        ));
    }
    Ok(())
}
