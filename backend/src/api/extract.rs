//! JSON body extractor that reports bad bodies through the API envelope.
//!
//! axum's own `Json` rejects missing or mistyped fields with a plain-text 422
//! before the handler runs. `ApiJson` turns those rejections into the same
//! 400 `validation_error` response every other validation failure produces.

use crate::api::common::service_error_to_http;
use crate::errors::ServiceError;
use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
};

/// Request body deserialized from JSON.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(service_error_to_http(rejection_error(&rejection), false)),
        }
    }
}

fn rejection_error(rejection: &JsonRejection) -> ServiceError {
    match rejection {
        JsonRejection::JsonDataError(error) => {
            let detail = error.body_text();
            let detail = detail
                .split_once("target type: ")
                .map(|(_, rest)| rest.to_string())
                .unwrap_or(detail);
            ServiceError::field(offending_field(&detail), detail)
        }
        JsonRejection::JsonSyntaxError(_) => {
            ServiceError::field("body", "Request body is not valid JSON")
        }
        JsonRejection::MissingJsonContentType(_) => {
            ServiceError::field("body", "Expected a JSON body with Content-Type: application/json")
        }
        _ => ServiceError::field("body", "Request body could not be read"),
    }
}

/// Field named by a deserialization error, in the snake_case form the
/// validators report.
fn offending_field(detail: &str) -> String {
    if let Some((_, rest)) = detail.split_once("missing field `") {
        if let Some((field, _)) = rest.split_once('`') {
            return snake_case(field);
        }
    }

    // Errors below the top level are prefixed with their path, e.g.
    // `email: invalid type: ...`.
    match detail.split_once(": ") {
        Some((path, _)) if !path.is_empty() && !path.contains(' ') => snake_case(path),
        _ => "body".to_string(),
    }
}

fn snake_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len() + 4);
    for c in field.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
