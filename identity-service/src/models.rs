//! Identity models
//!
//! Domain models for accounts and roles.

use serde::{Deserialize, Serialize};

/// A verified account as held by the credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Roles as of the last lookup, in role store order
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Identity {
    /// Create a new identity with no roles
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            first_name: None,
            last_name: None,
            roles: Vec::new(),
        }
    }

    /// Replace the role list
    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// A role definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Sign-up request. The email becomes the username.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Registration {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            first_name: None,
            last_name: None,
        }
    }

    /// Set the display name
    pub fn with_name(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self.last_name = Some(last_name.into());
        self
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_roles() {
        let identity = Identity::new("U1", "ada@example.com")
            .with_roles(vec!["admin".to_string(), "editor".to_string()]);
        assert!(identity.has_role("admin"));
        assert!(!identity.has_role("viewer"));
    }

    #[test]
    fn test_registration_debug_hides_password() {
        let registration = Registration::new("ada@example.com", "hunter22").with_name("Ada", "Lovelace");
        let debug = format!("{:?}", registration);
        assert!(!debug.contains("hunter22"));
        assert!(debug.contains("ada@example.com"));
    }

    #[test]
    fn test_registration_json() {
        let json = r#"{"email":"ada@example.com","password":"pw1234","firstName":"Ada","lastName":null}"#;
        let registration: Registration = serde_json::from_str(json).unwrap();
        assert_eq!(registration.first_name.as_deref(), Some("Ada"));
        assert!(registration.last_name.is_none());
    }
}
