//! Role and ownership checks applied to verified claims.
//!
//! A missing identity is always `Unauthenticated` (401); a present identity
//! without the required role or ownership is `Forbidden` (403).

use crate::database::models::Role;
use crate::errors::{ServiceError, ServiceResult};
use crate::utils::jwt::Claims;

pub fn require_authenticated(claims: Option<&Claims>) -> ServiceResult<&Claims> {
    claims.ok_or(ServiceError::Unauthenticated)
}

pub fn require_role<'a>(claims: Option<&'a Claims>, allowed: &[Role]) -> ServiceResult<&'a Claims> {
    let claims = require_authenticated(claims)?;
    if allowed.contains(&claims.role) {
        Ok(claims)
    } else {
        Err(ServiceError::forbidden(format!(
            "Role '{}' may not access this resource",
            claims.role
        )))
    }
}

/// Allows the owner of `owner_id` or any of the `privileged` roles.
pub fn require_ownership_or_role<'a>(
    claims: Option<&'a Claims>,
    owner_id: &str,
    privileged: &[Role],
) -> ServiceResult<&'a Claims> {
    let claims = require_authenticated(claims)?;
    if claims.sub == owner_id || privileged.contains(&claims.role) {
        Ok(claims)
    } else {
        Err(ServiceError::forbidden("Access limited to the account owner"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str, role: Role) -> Claims {
        Claims {
            sub: sub.to_string(),
            email: format!("{}@clinic.test", sub),
            role,
            iat: 0,
            exp: i64::MAX,
        }
    }

    #[test]
    fn test_missing_claims_are_unauthenticated() {
        assert!(matches!(
            require_authenticated(None),
            Err(ServiceError::Unauthenticated)
        ));
        assert!(matches!(
            require_role(None, &[Role::Admin]),
            Err(ServiceError::Unauthenticated)
        ));
        assert!(matches!(
            require_ownership_or_role(None, "1", &[Role::Admin]),
            Err(ServiceError::Unauthenticated)
        ));
    }

    #[test]
    fn test_require_role_distinguishes_forbidden() {
        let patient = claims("p1", Role::Patient);
        assert!(matches!(
            require_role(Some(&patient), &[Role::Admin]),
            Err(ServiceError::Forbidden { .. })
        ));
        assert!(require_role(Some(&patient), &[Role::Admin, Role::Patient]).is_ok());
        assert!(require_role(Some(&claims("a1", Role::Admin)), &[Role::Admin]).is_ok());
    }

    #[test]
    fn test_ownership_or_role() {
        let patient = claims("p1", Role::Patient);
        assert!(require_ownership_or_role(Some(&patient), "p1", &[Role::Admin]).is_ok());
        assert!(matches!(
            require_ownership_or_role(Some(&patient), "p2", &[Role::Admin]),
            Err(ServiceError::Forbidden { .. })
        ));
        let admin = claims("a1", Role::Admin);
        assert!(require_ownership_or_role(Some(&admin), "p2", &[Role::Admin]).is_ok());
    }
}
