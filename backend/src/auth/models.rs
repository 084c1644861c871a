//! Data structures for authentication requests and responses.
//!
//! Request bodies use camelCase field names. Validation rules are declared
//! with `validator`; password strength is checked separately by
//! `utils::password`.

use crate::services::identity_service::{Identity, ProfileDetails};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

const NAME_MIN_LEN: usize = 2;
const NAME_MAX_LEN: usize = 50;

/// Names are letters and spaces only, 2 to 50 characters.
fn validate_person_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    let length = trimmed.chars().count();
    if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&length) {
        return Err(ValidationError::new("name_length").with_message(
            format!(
                "Must be between {} and {} characters",
                NAME_MIN_LEN, NAME_MAX_LEN
            )
            .into(),
        ));
    }
    if !trimmed.chars().all(|c| c.is_alphabetic() || c == ' ') {
        return Err(ValidationError::new("name_characters")
            .with_message("May only contain letters and spaces".into()));
    }
    Ok(())
}

/// Login request payload
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Email must be valid"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Registration payload. Role-specific extras are flattened into the body.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Email must be valid"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    #[validate(custom(function = "validate_person_name"))]
    pub display_name: String,

    #[validate(custom(function = "validate_person_name"))]
    pub family_name: String,

    /// `admin`, `doctor` or `patient`. Defaults to `patient`.
    pub role: Option<String>,

    #[serde(flatten)]
    pub details: ProfileDetails,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyTokenRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(email(message = "Email must be valid"))]
    pub email: Option<String>,

    #[validate(custom(function = "validate_person_name"))]
    pub display_name: Option<String>,

    #[validate(custom(function = "validate_person_name"))]
    pub family_name: Option<String>,

    #[serde(flatten)]
    pub details: ProfileDetails,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,

    #[validate(must_match(other = "new_password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

/// Issued token together with the identity it was issued for.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub identity: Identity,
    pub expires_in: i64, // Token lifetime in seconds
}

#[derive(Debug, Serialize)]
pub struct IdentityResponse {
    pub identity: Identity,
}
