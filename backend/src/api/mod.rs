//! Central module for the application's API endpoints outside `/api/auth`.
//!
//! Holds the shared response envelope, the JSON body extractor and the
//! identity management routes.

pub mod common;
pub mod extract;
pub mod user;
