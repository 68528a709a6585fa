//! Common error types for the identity service.
//!
//! Every outcome is classified locally and never retried here. Failures of
//! an external store are carried unmodified inside a `Store` variant so a
//! caller can tell "access denied" apart from "dependency unavailable".

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Token rejected: {0}")]
    Rejected(#[from] TokenRejection),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Role error: {0}")]
    Role(#[from] RoleError),

    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),

    #[error("Access denied: {0}")]
    Access(#[from] AccessDenied),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl AppError {
    /// Whether the failure came from an unavailable dependency rather than a
    /// domain rejection.
    pub fn is_dependency_failure(&self) -> bool {
        matches!(
            self,
            AppError::Store(_)
                | AppError::Auth(AuthError::Store(_))
                | AppError::Role(RoleError::Store(_))
                | AppError::Registration(RegistrationError::Store(_))
        )
    }
}

/// Reasons a presented token is refused, in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum TokenRejection {
    #[error("Malformed token")]
    Malformed,

    #[error("Bad token signature")]
    BadSignature,

    #[error("Token issuer mismatch")]
    IssuerMismatch,

    #[error("Token audience mismatch")]
    AudienceMismatch,

    #[error("Token expired")]
    Expired,
}

/// Token issuance errors.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token creation failed: {0}")]
    CreationFailed(String),

    #[error("Expiry out of range")]
    ExpiryOutOfRange,
}

/// Authentication-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User not found")]
    NotFound,

    #[error("Email or password is incorrect")]
    BadCredentials,

    #[error("Credential store failure: {0}")]
    Store(#[from] StoreError),
}

/// Role management errors.
#[derive(Debug, Error)]
pub enum RoleError {
    #[error("Role name is empty or already taken: {0:?}")]
    DuplicateOrInvalid(String),

    #[error("Unknown identity: {0}")]
    UnknownIdentity(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Role store failure: {0}")]
    Store(#[from] StoreError),
}

/// Account registration errors.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Username '{0}' is already taken")]
    DuplicateUsername(String),

    #[error("Password does not satisfy policy: {0}")]
    InvalidPassword(String),

    #[error("Credential store failure: {0}")]
    Store(#[from] StoreError),
}

/// Authorization boundary outcome for a bearer credential.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessDenied {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid bearer token: {0}")]
    InvalidToken(TokenRejection),

    #[error("Role '{required}' is required")]
    Forbidden { required: String },
}

impl From<TokenRejection> for AccessDenied {
    fn from(rejection: TokenRejection) -> Self {
        AccessDenied::InvalidToken(rejection)
    }
}

/// Configuration errors raised at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing configuration value: {0}")]
    Missing(String),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: String, value: String },

    #[error("Signing secret is empty")]
    EmptySecret,

    #[error("Signing secret is {len} bytes, at least {min} required")]
    SecretTooShort { len: usize, min: usize },

    #[error("Issuer is empty")]
    EmptyIssuer,

    #[error("Expiration must be at least one day")]
    InvalidExpiration,
}

/// Failures of an external credential or role store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
}

/// Error response for API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Status class a transport should answer with
    pub status: u16,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(code: impl Into<String>, message: impl Into<String>, status: u16) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            status,
            details: None,
        }
    }

    /// Add details to the error response.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<TokenRejection> for ErrorResponse {
    fn from(rejection: TokenRejection) -> Self {
        let code = match rejection {
            TokenRejection::Malformed => "AUTH_TOKEN_MALFORMED",
            TokenRejection::BadSignature => "AUTH_TOKEN_BAD_SIGNATURE",
            TokenRejection::IssuerMismatch => "AUTH_TOKEN_ISSUER_MISMATCH",
            TokenRejection::AudienceMismatch => "AUTH_TOKEN_AUDIENCE_MISMATCH",
            TokenRejection::Expired => "AUTH_TOKEN_EXPIRED",
        };
        Self::new(code, rejection.to_string(), 401)
    }
}

impl From<TokenError> for ErrorResponse {
    fn from(err: TokenError) -> Self {
        Self::new("AUTH_TOKEN_CREATION_FAILED", "Failed to create token", 500)
            .with_details(err.to_string())
    }
}

impl From<StoreError> for ErrorResponse {
    fn from(err: StoreError) -> Self {
        let code = match &err {
            StoreError::ConnectionFailed(_) => "STORE_CONNECTION_FAILED",
            StoreError::QueryFailed(_) => "STORE_QUERY_FAILED",
            StoreError::TransactionFailed(_) => "STORE_TRANSACTION_FAILED",
        };
        Self::new(code, "Dependency unavailable", 503).with_details(err.to_string())
    }
}

impl From<AuthError> for ErrorResponse {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotFound => Self::new("AUTH_USER_NOT_FOUND", "User not found", 404),
            AuthError::BadCredentials => Self::new(
                "AUTH_INVALID_CREDENTIALS",
                "Email or password is incorrect",
                400,
            ),
            AuthError::Store(store) => store.into(),
        }
    }
}

impl From<RoleError> for ErrorResponse {
    fn from(err: RoleError) -> Self {
        match err {
            RoleError::DuplicateOrInvalid(name) => {
                Self::new("ROLE_DUPLICATE_OR_INVALID", "Role name is empty or taken", 409)
                    .with_details(name)
            }
            RoleError::UnknownIdentity(id) => {
                Self::new("ROLE_UNKNOWN_IDENTITY", "Unknown identity", 404).with_details(id)
            }
            RoleError::UnknownRole(name) => {
                Self::new("ROLE_UNKNOWN_ROLE", "Unknown role", 404).with_details(name)
            }
            RoleError::Store(store) => store.into(),
        }
    }
}

impl From<RegistrationError> for ErrorResponse {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::DuplicateUsername(name) => {
                Self::new("REGISTRATION_DUPLICATE_USERNAME", "Username is taken", 409)
                    .with_details(name)
            }
            RegistrationError::InvalidPassword(reason) => {
                Self::new("REGISTRATION_INVALID_PASSWORD", "Password rejected", 400)
                    .with_details(reason)
            }
            RegistrationError::Store(store) => store.into(),
        }
    }
}

impl From<AccessDenied> for ErrorResponse {
    fn from(err: AccessDenied) -> Self {
        match err {
            AccessDenied::MissingToken => {
                Self::new("AUTH_UNAUTHORIZED", "Missing bearer token", 401)
            }
            AccessDenied::InvalidToken(rejection) => rejection.into(),
            AccessDenied::Forbidden { required } => {
                Self::new("AUTH_FORBIDDEN", "Access forbidden", 403).with_details(required)
            }
        }
    }
}

impl From<ConfigError> for ErrorResponse {
    fn from(err: ConfigError) -> Self {
        Self::new("CONFIG_INVALID", "Invalid configuration", 500).with_details(err.to_string())
    }
}

impl From<AppError> for ErrorResponse {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Rejected(e) => e.into(),
            AppError::Token(e) => e.into(),
            AppError::Auth(e) => e.into(),
            AppError::Role(e) => e.into(),
            AppError::Registration(e) => e.into(),
            AppError::Access(e) => e.into(),
            AppError::Config(e) => e.into(),
            AppError::Store(e) => e.into(),
        }
    }
}

/// Result for operations that can fail along more than one path.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_codes() {
        let resp: ErrorResponse = TokenRejection::Expired.into();
        assert_eq!(resp.code, "AUTH_TOKEN_EXPIRED");
        assert_eq!(resp.status, 401);

        let resp: ErrorResponse = AccessDenied::InvalidToken(TokenRejection::BadSignature).into();
        assert_eq!(resp.code, "AUTH_TOKEN_BAD_SIGNATURE");
    }

    #[test]
    fn test_store_failure_is_distinct_from_denial() {
        let denied = AppError::from(AuthError::BadCredentials);
        let unavailable = AppError::from(AuthError::Store(StoreError::ConnectionFailed(
            "refused".to_string(),
        )));

        assert!(!denied.is_dependency_failure());
        assert!(unavailable.is_dependency_failure());

        let resp: ErrorResponse = unavailable.into();
        assert_eq!(resp.status, 503);
        assert_eq!(resp.code, "STORE_CONNECTION_FAILED");
    }

    #[test]
    fn test_forbidden_response() {
        let resp: ErrorResponse = AccessDenied::Forbidden {
            required: "admin".to_string(),
        }
        .into();
        assert_eq!(resp.status, 403);
        assert_eq!(resp.details.as_deref(), Some("admin"));
    }

    #[test]
    fn test_details_skipped_when_absent() {
        let json = serde_json::to_string(&ErrorResponse::from(AuthError::NotFound)).unwrap();
        assert!(!json.contains("details"));
    }
}
