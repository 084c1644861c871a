//! Defines the HTTP routes for identity lookup and account lifecycle.
//!
//! Nested under `/api/users` by the main router.

use super::handlers::{deactivate_user, get_user_by_id};
use crate::auth::middleware::{admin_auth, jwt_auth};
use axum::{
    Router, middleware,
    routing::{get, post},
};

pub fn user_router() -> Router {
    Router::new()
        .route(
            "/{id}",
            get(get_user_by_id).layer(middleware::from_fn(jwt_auth)),
        )
        .route(
            "/{id}/deactivate",
            post(deactivate_user)
                .layer(middleware::from_fn(admin_auth))
                .layer(middleware::from_fn(jwt_auth)),
        )
}
