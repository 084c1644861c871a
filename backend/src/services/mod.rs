//! Module for core business logic services.
//!
//! Identity resolution sits between the partition stores and the
//! authentication flows in `auth`.

pub mod identity_service;
