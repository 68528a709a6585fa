//! Token verification.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use error::{ConfigError, TokenRejection};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::claims::{ClaimSet, ID_CLAIM, ROLES_CLAIM};
use crate::config::JwtConfig;
use crate::issuer::TokenPayload;
use crate::key::SigningKey;

/// Identity context recovered from a valid token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedToken {
    pub identity_id: String,
    /// Role claims in token order, duplicates included
    pub roles: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

impl VerifiedToken {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }
}

/// Outcome of verifying a presented token.
pub type VerificationResult = Result<VerifiedToken, TokenRejection>;

/// Validates incoming tokens. Pure and local: no I/O, no shared mutable state.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    key: Arc<SigningKey>,
    issuer: String,
    clock_skew_secs: i64,
}

impl TokenVerifier {
    /// Create a verifier from validated configuration.
    pub fn new(config: &JwtConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let key = SigningKey::from_secret(&config.secret).map_err(|_| ConfigError::Invalid {
            key: "Secret".to_string(),
            value: "<redacted>".to_string(),
        })?;
        Ok(Self::with_key(Arc::new(key), config))
    }

    pub(crate) fn with_key(key: Arc<SigningKey>, config: &JwtConfig) -> Self {
        Self {
            key,
            issuer: config.issuer.clone(),
            clock_skew_secs: i64::try_from(config.clock_skew_secs).unwrap_or(i64::MAX),
        }
    }

    /// Verify against the current time.
    pub fn verify_now(&self, token: &str) -> VerificationResult {
        self.verify(token, Utc::now())
    }

    /// Verify `token` as of `now`. The first failing check decides the
    /// rejection: structure, signature, issuer, audience, expiry.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> VerificationResult {
        let result = self.check(token, now);
        if let Err(reason) = &result {
            tracing::warn!("Token rejected: {}", reason);
        }
        result
    }

    fn check(&self, token: &str, now: DateTime<Utc>) -> VerificationResult {
        let payload: TokenPayload = self.key.open(token)?;

        if payload.iss != self.issuer {
            tracing::debug!("Invalid issuer: expected {}, got {}", self.issuer, payload.iss);
            return Err(TokenRejection::IssuerMismatch);
        }

        // Audience is validated against the issuer, mirroring issuance.
        if !payload.aud.contains(&self.issuer) {
            return Err(TokenRejection::AudienceMismatch);
        }

        if payload.exp.saturating_add(self.clock_skew_secs) <= now.timestamp() {
            return Err(TokenRejection::Expired);
        }

        let expires_at =
            DateTime::<Utc>::from_timestamp(payload.exp, 0).ok_or(TokenRejection::Malformed)?;

        let identity_id = match payload.claims.get(ID_CLAIM) {
            Some(Value::String(id)) => id.clone(),
            _ => return Err(TokenRejection::Malformed),
        };
        let claims = ClaimSet::from_json_map(&payload.claims);
        let roles = claims.values(ROLES_CLAIM).map(str::to_string).collect();

        Ok(VerifiedToken {
            identity_id,
            roles,
            expires_at,
        })
    }
}
