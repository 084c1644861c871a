//! Middleware for protecting authenticated routes and handling authorization.
//!
//! `jwt_auth` and `optional_jwt_auth` verify bearer tokens and attach the
//! claims to the request extensions; `admin_auth` must run after `jwt_auth`.

use crate::api::common::service_error_to_http;
use crate::auth::gate::require_role;
use crate::database::models::Role;
use crate::errors::ServiceError;
use crate::state::AppState;
use crate::utils::jwt::{Claims, extract_bearer};
use axum::{
    extract::Request,
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

fn app_state(request: &Request) -> Result<AppState, (StatusCode, String)> {
    request.extensions().get::<AppState>().cloned().ok_or_else(|| {
        service_error_to_http(
            ServiceError::internal_error("Application state missing from request"),
            false,
        )
    })
}

fn bearer_token(request: &Request) -> Option<&str> {
    extract_bearer(
        request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|header| header.to_str().ok()),
    )
}

/// JWT authentication middleware
pub async fn jwt_auth(mut request: Request, next: Next) -> Result<Response, (StatusCode, String)> {
    let state = app_state(&request)?;

    let token = bearer_token(&request)
        .ok_or_else(|| state.reject(ServiceError::Unauthenticated))?;
    let claims = state
        .auth
        .jwt()
        .validate_token(token)
        .map_err(|error| state.reject(error))?;

    // Add claims to request extensions for use in handlers
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Optional JWT authentication middleware (doesn't fail if no token)
pub async fn optional_jwt_auth(
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    let state = app_state(&request)?;

    let claims: Option<Claims> =
        bearer_token(&request).and_then(|token| state.auth.jwt().validate_token(token).ok());

    // Always insert the Option<Claims>, even if it's None
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Admin role authorization middleware
pub async fn admin_auth(request: Request, next: Next) -> Result<Response, (StatusCode, String)> {
    let state = app_state(&request)?;

    require_role(request.extensions().get::<Claims>(), &[Role::Admin])
        .map_err(|error| state.reject(error))?;

    Ok(next.run(request).await)
}
