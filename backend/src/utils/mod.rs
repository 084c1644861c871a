//! Collection of general utility functions.
//!
//! Token handling and password hashing live here; both are pure helpers
//! with no knowledge of the identity store.

pub mod jwt;
pub mod password;
