//! Handler functions for authentication-related API endpoints.
//!
//! These functions parse request data, delegate to `auth::service` for the
//! core logic and wrap results in the standard `ApiResponse` envelope.

use crate::api::common::ApiResponse;
use crate::api::extract::ApiJson;
use crate::auth::models::*;
use crate::auth::service::ConnectionReport;
use crate::state::AppState;
use crate::utils::jwt::Claims;
use axum::{
    extract::Extension,
    http::StatusCode,
    response::Json as ResponseJson,
};
use tracing::info;

type HandlerResult<T> = Result<ResponseJson<ApiResponse<T>>, (StatusCode, String)>;

/// Handle login request for any role
#[axum::debug_handler]
pub async fn login(
    Extension(state): Extension<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> HandlerResult<AuthResponse> {
    match state.auth.login(payload).await {
        Ok(response) => Ok(ResponseJson(ApiResponse::success(
            response,
            "Login successful",
        ))),
        Err(error) => Err(state.reject(error)),
    }
}

/// Handle administrator login request
#[axum::debug_handler]
pub async fn login_admin(
    Extension(state): Extension<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> HandlerResult<AuthResponse> {
    match state.auth.login_admin(payload).await {
        Ok(response) => Ok(ResponseJson(ApiResponse::success(
            response,
            "Administrator login successful",
        ))),
        Err(error) => Err(state.reject(error)),
    }
}

/// Handle registration request. The caller's token, if any, decides whether
/// privileged roles may be created.
#[axum::debug_handler]
pub async fn register(
    Extension(state): Extension<AppState>,
    Extension(caller): Extension<Option<Claims>>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<AuthResponse>>), (StatusCode, String)>
{
    match state.auth.register(payload, caller.as_ref()).await {
        Ok(response) => Ok((
            StatusCode::CREATED,
            ResponseJson(ApiResponse::success(response, "Registration successful")),
        )),
        Err(error) => Err(state.reject(error)),
    }
}

#[axum::debug_handler]
pub async fn verify_token(
    Extension(state): Extension<AppState>,
    ApiJson(payload): ApiJson<VerifyTokenRequest>,
) -> HandlerResult<IdentityResponse> {
    match state.auth.verify_token(payload).await {
        Ok(response) => Ok(ResponseJson(ApiResponse::success(
            response,
            "Token is valid",
        ))),
        Err(error) => Err(state.reject(error)),
    }
}

#[axum::debug_handler]
pub async fn get_profile(
    Extension(state): Extension<AppState>,
    Extension(claims): Extension<Claims>,
) -> HandlerResult<IdentityResponse> {
    match state.auth.profile(&claims).await {
        Ok(response) => Ok(ResponseJson(ApiResponse::ok(response))),
        Err(error) => Err(state.reject(error)),
    }
}

#[axum::debug_handler]
pub async fn update_profile(
    Extension(state): Extension<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> HandlerResult<IdentityResponse> {
    match state.auth.update_profile(&claims, payload).await {
        Ok(response) => Ok(ResponseJson(ApiResponse::success(
            response,
            "Profile updated successfully",
        ))),
        Err(error) => Err(state.reject(error)),
    }
}

#[axum::debug_handler]
pub async fn change_password(
    Extension(state): Extension<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> HandlerResult<()> {
    match state.auth.change_password(&claims, payload).await {
        Ok(()) => Ok(ResponseJson(ApiResponse::success(
            (),
            "Password changed successfully",
        ))),
        Err(error) => Err(state.reject(error)),
    }
}

/// Handle logout request (client-side token invalidation)
#[axum::debug_handler]
pub async fn logout(Extension(claims): Extension<Claims>) -> HandlerResult<()> {
    // Tokens stay valid until they expire; the client discards its copy.
    info!("{} {} logged out", claims.role, claims.sub);
    Ok(ResponseJson(ApiResponse::success((), "Logged out successfully")))
}

/// Report whether the identity store answers
#[axum::debug_handler]
pub async fn test_connection(
    Extension(state): Extension<AppState>,
) -> HandlerResult<ConnectionReport> {
    let report = state.auth.test_connection().await;
    let message = if report.reachable {
        "Identity store connection OK"
    } else {
        "Identity store unreachable"
    };
    Ok(ResponseJson(ApiResponse::success(report, message)))
}
