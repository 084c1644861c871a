//! JWT token utilities for authentication and authorization.
//!
//! Provides bearer token issuance, validation and header parsing. Tokens are
//! HS256-signed and carry the identity id, email and role.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::database::models::Role;
use crate::errors::{ServiceError, ServiceResult};

/// Upper bound for the configured token lifetime (ten years).
const MAX_TTL_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

/// JWT Claims structure carrying the authenticated identity
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Identity ID
    pub sub: String,
    pub email: String,
    pub role: Role,
    /// Token issued at timestamp
    pub iat: i64,
    /// Token expiration timestamp
    pub exp: i64,
}

impl Claims {
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}

/// JWT token utility for issuing and validating tokens
pub struct JwtUtils {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    default_ttl: Duration,
}

impl JwtUtils {
    pub fn new(secret: &str, default_ttl_seconds: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        JwtUtils {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            default_ttl: Duration::seconds(default_ttl_seconds.min(MAX_TTL_SECONDS) as i64),
        }
    }

    pub fn default_ttl_seconds(&self) -> i64 {
        self.default_ttl.num_seconds()
    }

    /// Issues a token valid for the configured default window.
    pub fn generate_token(&self, user_id: &str, email: &str, role: Role) -> ServiceResult<String> {
        self.generate_token_with_ttl(user_id, email, role, self.default_ttl)
    }

    /// Issues a token valid for `ttl`. A zero or negative ttl yields a token
    /// that is already expired.
    pub fn generate_token_with_ttl(
        &self,
        user_id: &str,
        email: &str,
        role: Role,
        ttl: Duration,
    ) -> ServiceResult<String> {
        let now = Utc::now();
        let exp = now.checked_add_signed(ttl).unwrap_or(now);

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::internal_error(format!("Token generation failed: {}", e)))
    }

    /// Validates signature, structure and expiry, then returns the claims.
    pub fn validate_token(&self, token: &str) -> ServiceResult<Claims> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|token_data| token_data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => ServiceError::TokenExpired,
                _ => ServiceError::TokenMalformed,
            })?;

        // Expiry is exclusive: a token is dead at its `exp` second.
        if claims.exp <= Utc::now().timestamp() {
            return Err(ServiceError::TokenExpired);
        }

        Ok(claims)
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn extract_bearer(header: Option<&str>) -> Option<&str> {
    let mut parts = header?.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Some(token),
        _ => None,
    }
}
