//! Defines the HTTP routes specifically for authentication.
//!
//! Nested under `/api/auth` by the main router.

use crate::auth::handlers::*;
use crate::auth::middleware::*;
use axum::{
    Router, middleware,
    routing::{get, post},
};

/// Creates the authentication router with all auth-related routes
pub fn auth_router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/login-admin", post(login_admin))
        .route(
            "/register",
            post(register).layer(middleware::from_fn(optional_jwt_auth)),
        )
        .route("/verify", post(verify_token))
        .route(
            "/profile",
            get(get_profile)
                .put(update_profile)
                .layer(middleware::from_fn(jwt_auth)),
        )
        .route(
            "/change-password",
            post(change_password).layer(middleware::from_fn(jwt_auth)),
        )
        .route("/logout", post(logout).layer(middleware::from_fn(jwt_auth)))
        .route("/test", get(test_connection))
}
