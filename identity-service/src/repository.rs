//! Credential and role stores
//!
//! Boundaries to the external stores that own identities, password hashes,
//! role definitions and identity-role relations, plus in-memory versions
//! for tests and development.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use error::{RegistrationError, StoreError};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Identity, Registration, Role};

/// Store holding identities and verifying their passwords.
#[allow(async_fn_in_trait)]
pub trait CredentialStore: Send + Sync {
    /// Find the single identity with this username
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, StoreError>;

    /// Find an identity by id
    async fn find_by_id(&self, id: &str) -> Result<Option<Identity>, StoreError>;

    /// Compare a presented password with the stored hash
    async fn check_password(&self, identity: &Identity, password: &str) -> Result<bool, StoreError>;

    /// Create an identity, applying the store's uniqueness and password rules
    async fn create(&self, registration: &Registration) -> Result<Identity, RegistrationError>;
}

/// Store holding role definitions and identity-role relations.
#[allow(async_fn_in_trait)]
pub trait RoleStore: Send + Sync {
    /// Create a role. Returns false when the name is already taken.
    async fn create_role(&self, role: &Role) -> Result<bool, StoreError>;

    /// Find a role by name
    async fn find_role(&self, name: &str) -> Result<Option<Role>, StoreError>;

    /// Relate an identity to a role. Returns false when the relation already
    /// existed; no duplicate relation is recorded.
    async fn add_to_role(&self, identity_id: &str, role_name: &str) -> Result<bool, StoreError>;

    /// Role names for an identity in assignment order
    async fn roles_for(&self, identity_id: &str) -> Result<Vec<String>, StoreError>;
}

/// Password rules applied on account creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_digit: bool,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_non_alphanumeric: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 6,
            require_digit: true,
            require_lowercase: true,
            require_uppercase: false,
            require_non_alphanumeric: false,
        }
    }
}

impl PasswordPolicy {
    /// Check a password, describing the first rule it breaks
    pub fn check(&self, password: &str) -> Result<(), String> {
        if password.chars().count() < self.min_length {
            return Err(format!("must be at least {} characters", self.min_length));
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            return Err("must contain a digit".to_string());
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
            return Err("must contain a lowercase letter".to_string());
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
            return Err("must contain an uppercase letter".to_string());
        }
        if self.require_non_alphanumeric && password.chars().all(|c| c.is_alphanumeric()) {
            return Err("must contain a non-alphanumeric character".to_string());
        }
        Ok(())
    }
}

struct StoredIdentity {
    identity: Identity,
    password_hash: String,
}

/// In-memory credential store with Argon2 password hashes
pub struct InMemoryCredentialStore {
    identities: RwLock<Vec<StoredIdentity>>,
    policy: PasswordPolicy,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::with_policy(PasswordPolicy::default())
    }

    pub fn with_policy(policy: PasswordPolicy) -> Self {
        Self {
            identities: RwLock::new(Vec::new()),
            policy,
        }
    }

    fn hash_password(password: &str) -> Result<String, StoreError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| StoreError::QueryFailed(format!("password hashing failed: {}", e)))?;
        Ok(hash.to_string())
    }
}

impl Default for InMemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, StoreError> {
        let identities = self.identities.read().await;
        Ok(identities
            .iter()
            .find(|s| s.identity.username.eq_ignore_ascii_case(username))
            .map(|s| s.identity.clone()))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Identity>, StoreError> {
        let identities = self.identities.read().await;
        Ok(identities
            .iter()
            .find(|s| s.identity.id == id)
            .map(|s| s.identity.clone()))
    }

    async fn check_password(&self, identity: &Identity, password: &str) -> Result<bool, StoreError> {
        let identities = self.identities.read().await;
        let Some(stored) = identities.iter().find(|s| s.identity.id == identity.id) else {
            return Ok(false);
        };
        let parsed = PasswordHash::new(&stored.password_hash)
            .map_err(|e| StoreError::QueryFailed(format!("corrupt password hash: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    async fn create(&self, registration: &Registration) -> Result<Identity, RegistrationError> {
        self.policy
            .check(&registration.password)
            .map_err(RegistrationError::InvalidPassword)?;
        let password_hash = Self::hash_password(&registration.password)?;

        let mut identities = self.identities.write().await;
        if identities
            .iter()
            .any(|s| s.identity.username.eq_ignore_ascii_case(&registration.email))
        {
            return Err(RegistrationError::DuplicateUsername(registration.email.clone()));
        }

        let mut identity = Identity::new(Uuid::new_v4().to_string(), registration.email.clone());
        identity.first_name = registration.first_name.clone();
        identity.last_name = registration.last_name.clone();

        identities.push(StoredIdentity {
            identity: identity.clone(),
            password_hash,
        });
        Ok(identity)
    }
}

/// In-memory role store. Role names are unique ignoring case.
pub struct InMemoryRoleStore {
    roles: RwLock<Vec<Role>>,
    relations: RwLock<Vec<(String, String)>>,
}

impl InMemoryRoleStore {
    pub fn new() -> Self {
        Self {
            roles: RwLock::new(Vec::new()),
            relations: RwLock::new(Vec::new()),
        }
    }

    /// Number of recorded relations between an identity and a role
    pub async fn relation_count(&self, identity_id: &str, role_name: &str) -> usize {
        let relations = self.relations.read().await;
        relations
            .iter()
            .filter(|(id, role)| id == identity_id && role.eq_ignore_ascii_case(role_name))
            .count()
    }
}

impl Default for InMemoryRoleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RoleStore for InMemoryRoleStore {
    async fn create_role(&self, role: &Role) -> Result<bool, StoreError> {
        let mut roles = self.roles.write().await;
        if roles.iter().any(|r| r.name.eq_ignore_ascii_case(&role.name)) {
            return Ok(false);
        }
        roles.push(role.clone());
        Ok(true)
    }

    async fn find_role(&self, name: &str) -> Result<Option<Role>, StoreError> {
        let roles = self.roles.read().await;
        Ok(roles.iter().find(|r| r.name.eq_ignore_ascii_case(name)).cloned())
    }

    async fn add_to_role(&self, identity_id: &str, role_name: &str) -> Result<bool, StoreError> {
        let mut relations = self.relations.write().await;
        if relations
            .iter()
            .any(|(id, role)| id == identity_id && role.eq_ignore_ascii_case(role_name))
        {
            return Ok(false);
        }
        relations.push((identity_id.to_string(), role_name.to_string()));
        Ok(true)
    }

    async fn roles_for(&self, identity_id: &str) -> Result<Vec<String>, StoreError> {
        let relations = self.relations.read().await;
        Ok(relations
            .iter()
            .filter(|(id, _)| id == identity_id)
            .map(|(_, role)| role.clone())
            .collect())
    }
}
