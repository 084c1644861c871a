//! Core business logic for the authentication system.

use crate::auth::models::*;
use crate::config::{AdminBootstrap, Config};
use crate::database::models::Role;
use crate::errors::{ServiceError, ServiceResult};
use crate::services::identity_service::{Identity, IdentityResolver, NewIdentity, ProfileChanges};
use crate::utils::jwt::{Claims, JwtUtils};
use crate::utils::password::{PasswordHasher, assess_new_password};
use serde::Serialize;
use tracing::{info, warn};
use validator::{Validate, ValidateEmail};

/// Result of the store connectivity check.
#[derive(Debug, Serialize)]
pub struct ConnectionReport {
    pub backend: &'static str,
    pub reachable: bool,
}

/// Authentication service for login, registration, token and profile flows
pub struct AuthService {
    identities: IdentityResolver,
    hasher: PasswordHasher,
    jwt_utils: JwtUtils,
    allow_privileged_signup: bool,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_request<T: Validate>(request: &T) -> ServiceResult<()> {
    request
        .validate()
        .map_err(|errors| ServiceError::from_validation_errors(&errors))
}

impl AuthService {
    pub fn new(identities: IdentityResolver, config: &Config) -> ServiceResult<Self> {
        Ok(AuthService {
            identities,
            hasher: PasswordHasher::new(config.bcrypt_cost)?,
            jwt_utils: JwtUtils::new(&config.jwt_secret, config.jwt_expires_in_seconds),
            allow_privileged_signup: config.allow_privileged_signup,
        })
    }

    pub fn identities(&self) -> &IdentityResolver {
        &self.identities
    }

    pub fn jwt(&self) -> &JwtUtils {
        &self.jwt_utils
    }

    fn issue(&self, identity: Identity) -> ServiceResult<AuthResponse> {
        let token = self
            .jwt_utils
            .generate_token(&identity.id, &identity.email, identity.role)?;
        Ok(AuthResponse {
            token,
            identity,
            expires_in: self.jwt_utils.default_ttl_seconds(),
        })
    }

    /// Resolves the email and checks the password.
    ///
    /// Unknown emails and wrong passwords fail identically, and both pay for a
    /// bcrypt comparison.
    async fn authenticate(&self, email: &str, password: &str) -> ServiceResult<Identity> {
        let identity = match self.identities.find_by_email(email).await {
            Ok(identity) => identity,
            Err(ServiceError::NotFound { .. }) => {
                self.hasher.verify_decoy(password).await;
                warn!("Login rejected for unknown email");
                return Err(ServiceError::InvalidCredentials);
            }
            Err(error) => return Err(error),
        };

        if !self.hasher.verify(password, identity.secret_hash()).await {
            warn!("Login rejected for identity {}", identity.id);
            return Err(ServiceError::InvalidCredentials);
        }

        Ok(identity)
    }

    /// Authenticate any role and issue a token
    pub async fn login(&self, request: LoginRequest) -> ServiceResult<AuthResponse> {
        validate_request(&request)?;

        let identity = self
            .authenticate(&normalize_email(&request.email), &request.password)
            .await?;
        info!("{} {} logged in", identity.role, identity.id);
        self.issue(identity)
    }

    /// Authenticate an administrator. Other roles are rejected as bad credentials.
    pub async fn login_admin(&self, request: LoginRequest) -> ServiceResult<AuthResponse> {
        validate_request(&request)?;

        let identity = self
            .authenticate(&normalize_email(&request.email), &request.password)
            .await?;
        if identity.role != Role::Admin {
            warn!("Admin login rejected for {} {}", identity.role, identity.id);
            return Err(ServiceError::InvalidCredentials);
        }

        info!("Administrator {} logged in", identity.id);
        self.issue(identity)
    }

    /// Register a new identity and issue its first token.
    ///
    /// `caller` is the verified bearer of the request, if any. Doctor and
    /// admin accounts may only be created by an administrator unless
    /// privileged signup is enabled.
    pub async fn register(
        &self,
        request: RegisterRequest,
        caller: Option<&Claims>,
    ) -> ServiceResult<AuthResponse> {
        validate_request(&request)?;
        validate_request(&request.details)?;

        let role = match request.role.as_deref() {
            None => Role::Patient,
            Some(role) => role
                .parse::<Role>()
                .map_err(|_| ServiceError::InvalidRole {
                    role: role.to_string(),
                })?,
        };

        if role != Role::Patient
            && !self.allow_privileged_signup
            && !caller.is_some_and(Claims::is_admin)
        {
            return Err(ServiceError::forbidden(format!(
                "Only administrators may register {} accounts",
                role
            )));
        }

        assess_new_password(&request.password).into_result()?;

        let email = normalize_email(&request.email);
        if self.identities.email_exists(&email, None).await? {
            return Err(ServiceError::DuplicateEmail);
        }

        let secret_hash = self.hasher.hash(&request.password).await?;
        let identity = self
            .identities
            .create(
                role,
                NewIdentity {
                    email,
                    secret_hash,
                    display_name: request.display_name.trim().to_string(),
                    family_name: request.family_name.trim().to_string(),
                    details: request.details,
                },
            )
            .await?;

        info!("Registered {} {}", identity.role, identity.id);
        self.issue(identity)
    }

    /// Resolves the live identity behind verified claims.
    ///
    /// The identity must still be active and hold the role the token was
    /// issued for.
    pub async fn current_identity(&self, claims: &Claims) -> ServiceResult<Identity> {
        let identity = match self.identities.find_by_id(&claims.sub).await {
            Ok(identity) => identity,
            Err(ServiceError::NotFound { .. }) => return Err(ServiceError::InactiveAccount),
            Err(error) => return Err(error),
        };

        if identity.role != claims.role {
            return Err(ServiceError::Unauthenticated);
        }
        Ok(identity)
    }

    /// Verify a token and return the identity it belongs to
    pub async fn verify_token(
        &self,
        request: VerifyTokenRequest,
    ) -> ServiceResult<IdentityResponse> {
        validate_request(&request)?;

        let claims = self.jwt_utils.validate_token(request.token.trim())?;
        let identity = self.current_identity(&claims).await?;
        Ok(IdentityResponse { identity })
    }

    pub async fn profile(&self, claims: &Claims) -> ServiceResult<IdentityResponse> {
        let identity = self.current_identity(claims).await?;
        Ok(IdentityResponse { identity })
    }

    pub async fn update_profile(
        &self,
        claims: &Claims,
        request: UpdateProfileRequest,
    ) -> ServiceResult<IdentityResponse> {
        validate_request(&request)?;
        validate_request(&request.details)?;

        let current = self.current_identity(claims).await?;
        let identity = self
            .identities
            .update(
                &current.id,
                ProfileChanges {
                    email: request.email.as_deref().map(normalize_email),
                    display_name: request.display_name.map(|name| name.trim().to_string()),
                    family_name: request.family_name.map(|name| name.trim().to_string()),
                    details: request.details,
                },
            )
            .await?;

        info!("Updated profile of {} {}", identity.role, identity.id);
        Ok(IdentityResponse { identity })
    }

    /// Replace the password after checking the current one.
    pub async fn change_password(
        &self,
        claims: &Claims,
        request: ChangePasswordRequest,
    ) -> ServiceResult<()> {
        validate_request(&request)?;

        let identity = self.current_identity(claims).await?;
        if !self
            .hasher
            .verify(&request.current_password, identity.secret_hash())
            .await
        {
            return Err(ServiceError::field(
                "current_password",
                "Current password is incorrect",
            ));
        }
        if request.new_password == request.current_password {
            return Err(ServiceError::field(
                "new_password",
                "New password must differ from the current one",
            ));
        }
        assess_new_password(&request.new_password).into_result()?;

        let secret_hash = self.hasher.hash(&request.new_password).await?;
        self.identities.change_secret(&identity, &secret_hash).await?;
        info!("Password changed for {} {}", identity.role, identity.id);
        Ok(())
    }

    /// Creates the configured first administrator unless its email is taken.
    ///
    /// Returns the new identity, or `None` when an account already holds the
    /// email. The password goes through the same strength rules as
    /// registration.
    pub async fn ensure_admin(
        &self,
        bootstrap: &AdminBootstrap,
    ) -> ServiceResult<Option<Identity>> {
        let email = normalize_email(&bootstrap.email);
        if !email.validate_email() {
            return Err(ServiceError::field("email", "Bootstrap admin email is invalid"));
        }
        if self.identities.email_exists(&email, None).await? {
            info!("Bootstrap administrator already present, skipping");
            return Ok(None);
        }

        assess_new_password(&bootstrap.password).into_result()?;
        let secret_hash = self.hasher.hash(&bootstrap.password).await?;
        let identity = self
            .identities
            .create(
                Role::Admin,
                NewIdentity {
                    email,
                    secret_hash,
                    display_name: bootstrap.display_name.trim().to_string(),
                    family_name: bootstrap.family_name.trim().to_string(),
                    details: Default::default(),
                },
            )
            .await?;

        info!("Bootstrap administrator {} created", identity.id);
        Ok(Some(identity))
    }

    /// Round trip to the identity store.
    pub async fn test_connection(&self) -> ConnectionReport {
        let reachable = match self.identities.ping().await {
            Ok(()) => true,
            Err(error) => {
                warn!("Identity store check failed: {}", error);
                false
            }
        };
        ConnectionReport {
            backend: self.identities.backend_name(),
            reachable,
        }
    }
}
