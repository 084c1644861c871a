//! Main entry point for the clinic auth backend.
//!
//! This file initializes logging and configuration, connects the identity
//! store, and registers all API routes and middleware before serving.

mod api;
mod auth;
mod config;
mod database;
mod errors;
mod repositories;
mod services;
mod state;
mod utils;

use crate::api::common::ApiResponse;
use auth::service::AuthService;
use axum::{
    Extension, Router,
    http::{HeaderValue, Method, StatusCode, header},
    response::Json,
    routing::get,
};
use config::Config;
use serde_json::json;
use services::identity_service::IdentityResolver;
use state::AppState;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;
    let store = repositories::connect(&config.store).await?;
    info!("Using {} identity store", store.backend_name());

    let auth_service = AuthService::new(IdentityResolver::new(store), &config)?;
    if let Some(bootstrap) = &config.admin_bootstrap {
        auth_service.ensure_admin(bootstrap).await?;
    }
    let server_port = config.server_port;
    let app = build_router(AppState::new(auth_service, config));

    let bind_address = format!("0.0.0.0:{}", server_port);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    info!("Starting clinic auth server on port {}", server_port);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Assembles every route with the shared state, CORS and request tracing.
fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_allowed_origins);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .nest("/api/auth", auth::routes::auth_router())
        .nest("/api/users", api::user::routes::user_router())
        .fallback(not_found_handler)
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// An empty origin list allows no cross-origin access.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

async fn root_handler() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(
        json!({
            "service": "Clinic Auth Backend",
            "version": env!("CARGO_PKG_VERSION")
        }),
        "Welcome to the Clinic Auth API",
    ))
}

async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    let report = state.auth.test_connection().await;
    let (status, label) = if report.reachable {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(ApiResponse::success(
            json!({ "status": label, "store": report }),
            "Health check",
        )),
    )
}

async fn not_found_handler() -> (StatusCode, Json<ApiResponse<()>>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error("Route not found", "not_found", None)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::database::Database;
    use crate::database::models::Role;
    use crate::repositories::sqlite_store::SqliteStore;
    use crate::services::identity_service::{NewIdentity, ProfileDetails};
    use crate::utils::password::PasswordHasher;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn test_app() -> (Router, AppState) {
        let config = test_config();
        let db = Database::in_memory().await.unwrap();
        let identities = IdentityResolver::new(Arc::new(SqliteStore::new(db)));
        let auth_service = AuthService::new(identities, &config).unwrap();
        let state = AppState::new(auth_service, config);
        (build_router(state.clone()), state)
    }

    async fn create_admin(state: &AppState) -> String {
        let secret_hash = PasswordHasher::new(4)
            .unwrap()
            .hash("Secret123")
            .await
            .unwrap();
        state
            .auth
            .identities()
            .create(
                Role::Admin,
                NewIdentity {
                    email: "admin@clinic.test".to_string(),
                    secret_hash,
                    display_name: "Ada".to_string(),
                    family_name: "Admin".to_string(),
                    details: ProfileDetails::default(),
                },
            )
            .await
            .unwrap()
            .id
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn register_patient(app: &Router, email: &str) -> String {
        let (status, json) = send(
            app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "email": email,
                "password": "Secret123",
                "displayName": "Maria",
                "familyName": "Garcia",
                "phone": "999888777"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["identity"]["role"], "patient");
        json["data"]["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_admin_login_scenario() {
        let (app, state) = test_app().await;
        create_admin(&state).await;
        register_patient(&app, "maria@clinic.test").await;

        let (status, json) = send(
            &app,
            "POST",
            "/api/auth/login-admin",
            None,
            Some(json!({ "email": "admin@clinic.test", "password": "Secret123" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["identity"]["role"], "admin");
        assert_eq!(json["data"]["expires_in"], 86_400);
        assert!(json["data"]["identity"].get("secretHash").is_none());

        let (status, json) = send(
            &app,
            "POST",
            "/api/auth/login-admin",
            None,
            Some(json!({ "email": "maria@clinic.test", "password": "Secret123" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["error_type"], "invalid_credentials");
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (app, _) = test_app().await;
        register_patient(&app, "maria@clinic.test").await;

        let (wrong_status, wrong) = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "maria@clinic.test", "password": "Secret999" })),
        )
        .await;
        let (unknown_status, unknown) = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ghost@clinic.test", "password": "Secret123" })),
        )
        .await;
        assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_status, unknown_status);
        assert_eq!(wrong["message"], unknown["message"]);
        assert_eq!(wrong["error"], unknown["error"]);
    }

    #[tokio::test]
    async fn test_profile_requires_bearer() {
        let (app, _) = test_app().await;
        let token = register_patient(&app, "maria@clinic.test").await;

        let (status, json) = send(&app, "GET", "/api/auth/profile", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["error_type"], "unauthenticated");

        let (status, json) = send(&app, "GET", "/api/auth/profile", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["error_type"], "token_malformed");

        let (status, json) = send(&app, "GET", "/api/auth/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["identity"]["email"], "maria@clinic.test");

        let (status, json) = send(
            &app,
            "PUT",
            "/api/auth/profile",
            Some(&token),
            Some(json!({ "familyName": "Garcia Lopez", "bloodType": "A+" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["identity"]["familyName"], "Garcia Lopez");
        assert_eq!(json["data"]["identity"]["profile"]["bloodType"], "A+");

        let (status, _) = send(&app, "POST", "/api/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_register_validation_and_duplicates() {
        let (app, _) = test_app().await;
        register_patient(&app, "a@x.com").await;

        let (status, json) = send(
            &app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "email": "b@x.com",
                "password": "password",
                "displayName": "Maria",
                "familyName": "Garcia"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["error_type"], "weak_password");

        let (status, json) = send(
            &app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "email": "a@x.com",
                "password": "Secret123",
                "displayName": "Maria",
                "familyName": "Garcia"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["error_type"], "duplicate_email");

        let (status, json) = send(
            &app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "email": "c@x.com",
                "password": "Secret123",
                "displayName": "M",
                "familyName": "Garcia"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["error_type"], "validation_error");
        assert_eq!(json["error"]["details"][0]["field"], "display_name");
    }

    #[tokio::test]
    async fn test_privileged_registration_through_router() {
        let (app, state) = test_app().await;
        create_admin(&state).await;

        let doctor = json!({
            "email": "house@clinic.test",
            "password": "Secret123",
            "displayName": "Gregory",
            "familyName": "House",
            "role": "doctor",
            "licenseNumber": "CMP-1234"
        });

        let (status, json) =
            send(&app, "POST", "/api/auth/register", None, Some(doctor.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"]["error_type"], "forbidden");

        let (_, login) = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "admin@clinic.test", "password": "Secret123" })),
        )
        .await;
        let admin_token = login["data"]["token"].as_str().unwrap().to_string();

        let (status, json) = send(
            &app,
            "POST",
            "/api/auth/register",
            Some(&admin_token),
            Some(doctor),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["identity"]["role"], "doctor");
        assert_eq!(json["data"]["identity"]["profile"]["licenseNumber"], "CMP-1234");
    }

    #[tokio::test]
    async fn test_user_access_and_deactivation() {
        let (app, state) = test_app().await;
        let admin_id = create_admin(&state).await;
        let patient_token = register_patient(&app, "maria@clinic.test").await;
        let patient_id = state
            .auth
            .jwt()
            .validate_token(&patient_token)
            .unwrap()
            .sub;

        let (status, _) = send(
            &app,
            "GET",
            &format!("/api/users/{}", patient_id),
            Some(&patient_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            "GET",
            &format!("/api/users/{}", admin_id),
            Some(&patient_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/users/{}/deactivate", patient_id),
            Some(&patient_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let admin_token = state
            .auth
            .jwt()
            .generate_token(&admin_id, "admin@clinic.test", Role::Admin)
            .unwrap();
        let (status, json) = send(
            &app,
            "POST",
            &format!("/api/users/{}/deactivate", patient_id),
            Some(&admin_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["active"], false);

        let (status, json) = send(
            &app,
            "POST",
            "/api/auth/verify",
            None,
            Some(json!({ "token": patient_token })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["error_type"], "inactive_account");
    }

    #[tokio::test]
    async fn test_verify_reports_expired_tokens() {
        let (app, state) = test_app().await;
        let expired = state
            .auth
            .jwt()
            .generate_token_with_ttl("1", "a@x.com", Role::Patient, chrono::Duration::zero())
            .unwrap();

        let (status, json) = send(
            &app,
            "POST",
            "/api/auth/verify",
            None,
            Some(json!({ "token": expired })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["error_type"], "token_expired");
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let (app, _) = test_app().await;

        let (status, json) = send(&app, "GET", "/", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);

        let (status, json) = send(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "ok");
        assert_eq!(json["data"]["store"]["backend"], "sqlite");

        let (status, json) = send(&app, "GET", "/api/auth/test", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["reachable"], true);
    }

    #[tokio::test]
    async fn test_unreadable_bodies_are_validation_errors() {
        let (app, _) = test_app().await;

        let (status, json) = send(
            &app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "password": "Secret123",
                "displayName": "Ana",
                "familyName": "Torres"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["error_type"], "validation_error");
        assert_eq!(json["error"]["details"][0]["field"], "email");

        let (status, json) = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": 5, "password": "Secret123" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["error_type"], "validation_error");

        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"]["details"][0]["field"], "body");
    }

    #[tokio::test]
    async fn test_unknown_routes_get_json_not_found() {
        let (app, _) = test_app().await;

        let (status, json) = send(&app, "GET", "/api/nowhere", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Route not found");
        assert_eq!(json["error"]["error_type"], "not_found");
    }
}
