//! Response envelope and error conversion shared by all handlers.
//!
//! Every endpoint answers with an `ApiResponse`. Service errors are mapped to
//! a status code plus a machine-readable `error_type`:
//!
//! - `validation_error`, `weak_password`, `duplicate_email`, `invalid_role`: 400
//! - `invalid_credentials`, `inactive_account`, `token_expired`,
//!   `token_malformed`, `unauthenticated`: 401
//! - `forbidden`: 403
//! - `not_found`: 404
//! - `upstream_unavailable`, `internal_error`: 500
//!
//! Upstream failures only expose their cause when diagnostics are enabled.

use crate::errors::ServiceError;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Standard API response wrapper for all endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Indicates if the request was successful
    pub success: bool,
    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Human-readable message
    pub message: String,
    /// Error details (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
    pub timestamp: String,
}

/// Error details for failed requests
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Machine-readable error type identifier
    pub error_type: String,
    /// Field-specific validation errors when applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

/// Field-specific validation error details
#[derive(Debug, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    /// Create a successful response
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create a successful response with default message
    pub fn ok(data: T) -> Self {
        Self::success(data, "Request successful")
    }

    /// Create an error response
    pub fn error(
        message: impl Into<String>,
        error_type: impl Into<String>,
        details: Option<Vec<FieldError>>,
    ) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            message: message.into(),
            error: Some(ErrorDetails {
                error_type: error_type.into(),
                details,
            }),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Converts ServiceError to the HTTP status and serialized error envelope.
///
/// `diagnostics` controls whether upstream failure causes reach the client.
pub fn service_error_to_http(error: ServiceError, diagnostics: bool) -> (StatusCode, String) {
    let message = error.to_string();
    let (status, error_type, message, details) = match error {
        ServiceError::Validation { message, fields } => {
            let details = fields
                .into_iter()
                .map(|issue| FieldError {
                    field: issue.field,
                    message: issue.message,
                })
                .collect::<Vec<_>>();
            (
                StatusCode::BAD_REQUEST,
                "validation_error",
                message,
                (!details.is_empty()).then_some(details),
            )
        }
        ServiceError::WeakSecret { problems } => {
            let details = problems
                .into_iter()
                .map(|problem| FieldError {
                    field: "password".to_string(),
                    message: problem,
                })
                .collect::<Vec<_>>();
            (StatusCode::BAD_REQUEST, "weak_password", message, Some(details))
        }
        ServiceError::DuplicateEmail => (StatusCode::BAD_REQUEST, "duplicate_email", message, None),
        ServiceError::InvalidRole { .. } => {
            (StatusCode::BAD_REQUEST, "invalid_role", message, None)
        }
        ServiceError::InvalidCredentials => {
            (StatusCode::UNAUTHORIZED, "invalid_credentials", message, None)
        }
        ServiceError::InactiveAccount => {
            (StatusCode::UNAUTHORIZED, "inactive_account", message, None)
        }
        ServiceError::TokenExpired => (StatusCode::UNAUTHORIZED, "token_expired", message, None),
        ServiceError::TokenMalformed => {
            (StatusCode::UNAUTHORIZED, "token_malformed", message, None)
        }
        ServiceError::Unauthenticated => {
            (StatusCode::UNAUTHORIZED, "unauthenticated", message, None)
        }
        ServiceError::Forbidden { message } => (StatusCode::FORBIDDEN, "forbidden", message, None),
        ServiceError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found", message, None),
        ServiceError::Upstream { source } => {
            error!("Identity store error: {:#}", source);
            let message = if diagnostics {
                format!("Identity store unavailable: {:#}", source)
            } else {
                "Internal server error".to_string()
            };
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "upstream_unavailable",
                message,
                None,
            )
        }
        ServiceError::InternalError { message } => {
            error!("Internal error: {}", message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error".to_string(),
                None,
            )
        }
    };

    let error_response = ApiResponse::<()>::error(message, error_type, details);
    let body = serde_json::to_string(&error_response)
        .unwrap_or_else(|_| r#"{"success":false,"message":"Internal server error"}"#.to_string());
    (status, body)
}
