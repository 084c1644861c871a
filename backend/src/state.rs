//! Shared application state handed to handlers and middleware.

use crate::api::common::service_error_to_http;
use crate::auth::service::AuthService;
use crate::config::Config;
use crate::errors::ServiceError;
use axum::http::StatusCode;
use std::sync::Arc;

/// Immutable after startup; attached to every request as an `Extension`.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(auth: AuthService, config: Config) -> Self {
        Self {
            auth: Arc::new(auth),
            config: Arc::new(config),
        }
    }

    /// Converts a service error using the configured diagnostics mode.
    pub fn reject(&self, error: ServiceError) -> (StatusCode, String) {
        service_error_to_http(error, self.config.diagnostics_enabled())
    }
}
