//! Authentication module for login, registration, tokens and access control.
//!
//! This module provides the public interface for authentication: request
//! models, the auth service, its handlers and routes, the authorization gate
//! and the middleware that applies it.

pub mod gate;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod service;
