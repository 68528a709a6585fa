//! Identity service
//!
//! Authentication, role assignment and token issuance on top of the
//! credential and role stores.

use std::sync::Arc;

use auth::{BearerGuard, JwtConfig, SignedToken, TokenIssuer, VerificationResult, VerifiedToken};
use chrono::{DateTime, Local, TimeZone, Utc};
use error::{AccessDenied, AuthError, ConfigError, RegistrationError, RoleError};

use crate::models::{Identity, Registration, Role};
use crate::repository::{CredentialStore, RoleStore};

/// Verifies presented passwords against the credential store.
pub struct CredentialAuthenticator<C> {
    store: Arc<C>,
}

impl<C: CredentialStore> CredentialAuthenticator<C> {
    pub fn new(store: Arc<C>) -> Self {
        Self { store }
    }

    /// Look up exactly one identity by username and check its password.
    ///
    /// Hashing is entirely the store's business; the password is never
    /// logged or returned.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Identity, AuthError> {
        let identity = self
            .store
            .find_by_username(username)
            .await?
            .ok_or_else(|| {
                tracing::warn!(username, "Sign-in for unknown user");
                AuthError::NotFound
            })?;

        if !self.store.check_password(&identity, password).await? {
            tracing::warn!(username, "Sign-in with wrong password");
            return Err(AuthError::BadCredentials);
        }

        Ok(identity)
    }
}

/// Creates roles and binds identities to them.
pub struct RoleAssignmentService<C, R> {
    credentials: Arc<C>,
    roles: Arc<R>,
}

impl<C: CredentialStore, R: RoleStore> RoleAssignmentService<C, R> {
    pub fn new(credentials: Arc<C>, roles: Arc<R>) -> Self {
        Self { credentials, roles }
    }

    /// Create a role. Empty names and names already taken are refused.
    pub async fn create_role(&self, name: &str) -> Result<Role, RoleError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RoleError::DuplicateOrInvalid(name.to_string()));
        }

        let role = Role::new(name);
        if !self.roles.create_role(&role).await? {
            return Err(RoleError::DuplicateOrInvalid(name.to_string()));
        }

        tracing::info!(role = %role.name, "Role created");
        Ok(role)
    }

    /// Bind an identity to a role. Binding twice keeps a single relation.
    pub async fn assign_role(&self, identity_id: &str, role_name: &str) -> Result<(), RoleError> {
        if self.credentials.find_by_id(identity_id).await?.is_none() {
            return Err(RoleError::UnknownIdentity(identity_id.to_string()));
        }
        self.bind(identity_id, role_name).await
    }

    /// Bind the identity with `username` to a role.
    pub async fn assign_role_by_username(&self, username: &str, role_name: &str) -> Result<(), RoleError> {
        let identity = self
            .credentials
            .find_by_username(username)
            .await?
            .ok_or_else(|| RoleError::UnknownIdentity(username.to_string()))?;
        self.bind(&identity.id, role_name).await
    }

    /// Current roles of an identity, in role store order.
    pub async fn roles_for(&self, identity_id: &str) -> Result<Vec<String>, RoleError> {
        Ok(self.roles.roles_for(identity_id).await?)
    }

    async fn bind(&self, identity_id: &str, role_name: &str) -> Result<(), RoleError> {
        let role = self
            .roles
            .find_role(role_name)
            .await?
            .ok_or_else(|| RoleError::UnknownRole(role_name.to_string()))?;

        if self.roles.add_to_role(identity_id, &role.name).await? {
            tracing::info!(identity_id, role = %role.name, "Role assigned");
        } else {
            tracing::debug!(identity_id, role = %role.name, "Role already assigned");
        }
        Ok(())
    }
}

/// Account, role and token operations behind one facade.
pub struct IdentityService<C, R> {
    credentials: Arc<C>,
    authenticator: CredentialAuthenticator<C>,
    roles: RoleAssignmentService<C, R>,
    issuer: TokenIssuer,
    guard: BearerGuard,
}

impl<C: CredentialStore, R: RoleStore> IdentityService<C, R> {
    /// Create the service. Fails when the signing configuration is invalid.
    pub fn new(config: &JwtConfig, credentials: Arc<C>, roles: Arc<R>) -> Result<Self, ConfigError> {
        let (issuer, verifier) = auth::token_pair(config)?;
        Ok(Self {
            authenticator: CredentialAuthenticator::new(Arc::clone(&credentials)),
            roles: RoleAssignmentService::new(Arc::clone(&credentials), roles),
            credentials,
            issuer,
            guard: BearerGuard::new(verifier),
        })
    }

    /// Issuer named in every token this service mints.
    pub fn issuer(&self) -> &str {
        self.issuer.issuer()
    }

    /// Register a new account; the email becomes the username.
    pub async fn sign_up(&self, registration: &Registration) -> Result<Identity, RegistrationError> {
        let identity = self.credentials.create(registration).await?;
        tracing::info!(identity_id = %identity.id, "Identity registered");
        Ok(identity)
    }

    /// Authenticate and issue a token, with expiry on the local clock.
    pub async fn sign_in(&self, username: &str, password: &str) -> error::Result<SignedToken> {
        self.sign_in_at(username, password, Local::now()).await
    }

    /// Authenticate and issue a token as of `now`.
    pub async fn sign_in_at<Tz: TimeZone>(
        &self,
        username: &str,
        password: &str,
        now: DateTime<Tz>,
    ) -> error::Result<SignedToken> {
        let identity = self.authenticator.authenticate(username, password).await?;
        let roles = self.roles.roles_for(&identity.id).await?;
        let token = self.issuer.issue(&identity.id, &roles, &now)?;
        tracing::info!(identity_id = %identity.id, "Token issued");
        Ok(token)
    }

    /// Authenticate and return the identity with its current roles.
    pub async fn current_identity(&self, username: &str, password: &str) -> error::Result<Identity> {
        let identity = self.authenticator.authenticate(username, password).await?;
        let roles = self.roles.roles_for(&identity.id).await?;
        Ok(identity.with_roles(roles))
    }

    pub async fn create_role(&self, name: &str) -> Result<Role, RoleError> {
        self.roles.create_role(name).await
    }

    pub async fn assign_role(&self, identity_id: &str, role_name: &str) -> Result<(), RoleError> {
        self.roles.assign_role(identity_id, role_name).await
    }

    pub async fn assign_role_by_username(&self, username: &str, role_name: &str) -> Result<(), RoleError> {
        self.roles.assign_role_by_username(username, role_name).await
    }

    pub async fn roles_for(&self, identity_id: &str) -> Result<Vec<String>, RoleError> {
        self.roles.roles_for(identity_id).await
    }

    /// Verify a raw token against the current time.
    pub fn verify(&self, token: &str) -> VerificationResult {
        self.guard.verifier().verify_now(token)
    }

    /// Gate a request on its `Authorization` header and an optional role.
    pub fn authorize(&self, header_value: Option<&str>, role: Option<&str>) -> Result<VerifiedToken, AccessDenied> {
        self.authorize_at(header_value, role, Utc::now())
    }

    pub fn authorize_at(
        &self,
        header_value: Option<&str>,
        role: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<VerifiedToken, AccessDenied> {
        match role {
            Some(role) => self.guard.authorize(header_value, role, now),
            None => self.guard.authenticate(header_value, now),
        }
    }
}
