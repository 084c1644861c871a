//! Handler functions for identity lookup and account lifecycle endpoints.

use crate::api::common::ApiResponse;
use crate::auth::gate::{require_ownership_or_role, require_role};
use crate::database::models::Role;
use crate::errors::ServiceError;
use crate::services::identity_service::Identity;
use crate::state::AppState;
use crate::utils::jwt::Claims;
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
};

/// Retrieves an identity by its ID. Owners may read themselves; admins anyone.
#[axum::debug_handler]
pub async fn get_user_by_id(
    Extension(state): Extension<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Identity>>, (StatusCode, String)> {
    require_ownership_or_role(Some(&claims), &id, &[Role::Admin])
        .map_err(|error| state.reject(error))?;

    tracing::info!("Getting identity {} for {}", id, claims.sub);

    let identity = state
        .auth
        .identities()
        .find_by_id(&id)
        .await
        .map_err(|error| state.reject(error))?;

    Ok(Json(ApiResponse::success(
        identity,
        "User retrieved successfully",
    )))
}

/// Deactivates an account. Admin only; records are never deleted.
#[axum::debug_handler]
pub async fn deactivate_user(
    Extension(state): Extension<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Identity>>, (StatusCode, String)> {
    require_role(Some(&claims), &[Role::Admin]).map_err(|error| state.reject(error))?;

    if claims.sub == id {
        return Err(state.reject(ServiceError::validation(
            "Administrators cannot deactivate their own account",
        )));
    }

    let identities = state.auth.identities();
    let identity = identities
        .find_by_id(&id)
        .await
        .map_err(|error| state.reject(error))?;
    let deactivated = identities
        .deactivate(&identity)
        .await
        .map_err(|error| state.reject(error))?;

    tracing::info!("Identity {} deactivated by {}", id, claims.sub);
    Ok(Json(ApiResponse::success(
        deactivated,
        "User deactivated successfully",
    )))
}
