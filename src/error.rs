// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::JwtError;
use crate::services::intake::IntakeError;
use crate::services::links::LinkError;
use crate::services::team::TeamError;
use crate::store::StoreError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field: Option<&'static str>,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    PermissionDenied(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),
    InviteConsumed,

    // 410 Gone
    InviteExpired,

    // 500 Internal Server Error
    StorageError(String),
    InternalServerError(String),

    // 501 Not Implemented (store lacks the capability)
    Unsupported(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::PermissionDenied(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InviteConsumed => 409,
            ApiError::InviteExpired => 410,
            ApiError::StorageError(_) => 500,
            ApiError::InternalServerError(_) => 500,
            ApiError::Unsupported(_) => 501,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::Unauthorized(msg) => msg,
            ApiError::PermissionDenied(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InviteConsumed => "Invite token was already used",
            ApiError::InviteExpired => "Invite token has expired",
            ApiError::StorageError(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::Unsupported(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "VALIDATION_ERROR",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::PermissionDenied(_) => "PERMISSION_DENIED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InviteConsumed => "INVITE_CONSUMED",
            ApiError::InviteExpired => "INVITE_EXPIRED",
            ApiError::StorageError(_) => "STORAGE_ERROR",
            ApiError::InternalServerError(_) => "INTERNAL_ERROR",
            ApiError::Unsupported(_) => "UNSUPPORTED",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "success": false,
            "error": self.message(),
            "code": self.error_code()
        });

        if let ApiError::ValidationError { field: Some(field), .. } = self {
            body["details"] = json!({ "field": field });
        }

        body
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, field: Option<&'static str>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        ApiError::PermissionDenied(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn storage_error(message: impl Into<String>) -> Self {
        ApiError::StorageError(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        ApiError::Unsupported(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => ApiError::not_found(msg),
            StoreError::Conflict(msg) => ApiError::conflict(msg),
            StoreError::Unavailable(msg) => {
                tracing::error!("Store unavailable: {}", msg);
                ApiError::service_unavailable("Storage temporarily unavailable")
            }
            StoreError::Query(msg) => {
                // Don't expose internal query errors to clients
                tracing::error!("Store query error: {}", msg);
                ApiError::storage_error("An error occurred while accessing storage")
            }
            StoreError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::storage_error("An error occurred while accessing storage")
            }
        }
    }
}

impl From<TeamError> for ApiError {
    fn from(err: TeamError) -> Self {
        match err {
            TeamError::Validation { field, message } => ApiError::ValidationError {
                message,
                field: Some(field),
            },
            TeamError::PermissionDenied(msg) => ApiError::permission_denied(msg),
            TeamError::NotFound(msg) => ApiError::not_found(msg),
            TeamError::Conflict(msg) => ApiError::conflict(msg),
            TeamError::InviteExpired => ApiError::InviteExpired,
            TeamError::InviteConsumed => ApiError::InviteConsumed,
            TeamError::Unsupported(msg) => ApiError::unsupported(msg),
            TeamError::Store(store_err) => store_err.into(),
        }
    }
}

impl From<LinkError> for ApiError {
    fn from(err: LinkError) -> Self {
        match err {
            LinkError::NotFound(code) => {
                ApiError::not_found(format!("Short link not found: {}", code))
            }
            LinkError::Validation { field, message } => ApiError::ValidationError {
                message,
                field: Some(field),
            },
            LinkError::PermissionDenied(msg) => ApiError::permission_denied(msg),
            LinkError::CodeAllocation => {
                tracing::error!("Short code allocation exhausted retries");
                ApiError::conflict("Could not allocate a unique short code")
            }
            LinkError::Store(store_err) => store_err.into(),
        }
    }
}

impl From<IntakeError> for ApiError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::MissingField(field) => ApiError::ValidationError {
                message: format!("Missing required field: {}", field),
                field: Some(field),
            },
            IntakeError::PermissionDenied(msg) => ApiError::permission_denied(msg),
            IntakeError::Storage(store_err) => store_err.into(),
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::TokenValidation(msg) => {
                tracing::warn!("JWT validation failed: {}", msg);
                ApiError::unauthorized("Invalid or expired token")
            }
            JwtError::TokenGeneration(msg) => {
                tracing::error!("JWT generation failed: {}", msg);
                ApiError::internal_server_error("Could not issue token")
            }
            JwtError::InvalidSecret => {
                tracing::error!("JWT secret rejected by signer");
                ApiError::internal_server_error("Could not issue token")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
