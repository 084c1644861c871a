//! Password hashing, verification and strength assessment.
//!
//! Hashing and verification use bcrypt and run on the blocking thread pool so
//! request handling is not stalled by the key derivation work.

use crate::errors::{ServiceError, ServiceResult};
use serde::Serialize;

pub const MIN_SECRET_LEN: usize = 6;
/// bcrypt only reads this many bytes of its input.
pub const MAX_SECRET_BYTES: usize = 72;

const COMMON_SECRETS: [&str; 10] = [
    "password",
    "123456",
    "123456789",
    "qwerty",
    "abc123",
    "password123",
    "admin",
    "letmein",
    "welcome",
    "monkey",
];

/// Advisory result of a strength check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrengthReport {
    pub valid: bool,
    pub problems: Vec<String>,
}

impl StrengthReport {
    fn from_problems(problems: Vec<String>) -> Self {
        Self {
            valid: problems.is_empty(),
            problems,
        }
    }

    /// Turns an invalid report into a `WeakSecret` error.
    pub fn into_result(self) -> ServiceResult<()> {
        if self.valid {
            Ok(())
        } else {
            Err(ServiceError::WeakSecret {
                problems: self.problems,
            })
        }
    }
}

fn too_long_message() -> String {
    format!("Password must be at most {} bytes long", MAX_SECRET_BYTES)
}

/// Checks length bounds and the common-password denylist.
pub fn assess_strength(secret: &str) -> StrengthReport {
    let mut problems = Vec::new();
    let length = secret.chars().count();

    if length < MIN_SECRET_LEN {
        problems.push(format!(
            "Password must be at least {} characters long",
            MIN_SECRET_LEN
        ));
    }
    if secret.len() > MAX_SECRET_BYTES {
        problems.push(too_long_message());
    }
    if COMMON_SECRETS.contains(&secret.to_lowercase().as_str()) {
        problems.push("Password is too common, choose a less predictable one".to_string());
    }

    StrengthReport::from_problems(problems)
}

/// Strength rules applied to passwords chosen at registration or on change.
///
/// Adds the composition rule (lowercase, uppercase and digit) on top of
/// `assess_strength`.
pub fn assess_new_password(secret: &str) -> StrengthReport {
    let mut problems = assess_strength(secret).problems;

    let has_lower = secret.chars().any(|c| c.is_lowercase());
    let has_upper = secret.chars().any(|c| c.is_uppercase());
    let has_digit = secret.chars().any(|c| c.is_ascii_digit());
    if !(has_lower && has_upper && has_digit) {
        problems.push(
            "Password must contain at least one lowercase letter, one uppercase letter \
             and one number"
                .to_string(),
        );
    }

    StrengthReport::from_problems(problems)
}

/// bcrypt hasher with a fixed cost factor.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
    /// Hash compared against when no stored hash exists, so unknown accounts
    /// cost the same bcrypt work as known ones.
    decoy_hash: String,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> ServiceResult<Self> {
        let decoy_hash = bcrypt::hash("decoy-password-for-unknown-accounts", cost)
            .map_err(|e| ServiceError::internal_error(format!("Password hashing failed: {}", e)))?;
        Ok(Self { cost, decoy_hash })
    }

    /// Hashes `secret` with a fresh salt.
    ///
    /// Secrets longer than `MAX_SECRET_BYTES` are refused rather than
    /// truncated.
    pub async fn hash(&self, secret: &str) -> ServiceResult<String> {
        if secret.is_empty() || secret.chars().count() < MIN_SECRET_LEN {
            return Err(ServiceError::WeakSecret {
                problems: vec![format!(
                    "Password must be at least {} characters long",
                    MIN_SECRET_LEN
                )],
            });
        }
        if secret.len() > MAX_SECRET_BYTES {
            return Err(ServiceError::WeakSecret {
                problems: vec![too_long_message()],
            });
        }

        let secret = secret.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(secret, cost))
            .await
            .map_err(|e| ServiceError::internal_error(format!("Hashing task failed: {}", e)))?
            .map_err(|e| ServiceError::internal_error(format!("Password hashing failed: {}", e)))
    }

    /// Compares `secret` with a stored hash. Malformed input yields `false`,
    /// and so does a secret bcrypt would have to truncate.
    pub async fn verify(&self, secret: &str, hash: &str) -> bool {
        if secret.is_empty() || hash.is_empty() || secret.len() > MAX_SECRET_BYTES {
            return false;
        }

        let secret = secret.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || bcrypt::verify(secret, &hash).unwrap_or(false))
            .await
            .unwrap_or(false)
    }

    /// Spends the same effort as `verify` without a real hash. Always `false`.
    pub async fn verify_decoy(&self, secret: &str) -> bool {
        let decoy = self.decoy_hash.clone();
        self.verify(secret, &decoy).await;
        false
    }
}
