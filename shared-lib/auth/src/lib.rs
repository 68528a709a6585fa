//! Bearer token core for the identity service.
//!
//! This crate mints HS256-signed JWTs for verified identities and validates
//! them again on later requests. Issuance and verification are pure; the
//! signing configuration is injected at construction and never mutated.

mod claims;
mod config;
mod guard;
mod issuer;
mod key;
mod verifier;

use std::sync::Arc;

use error::ConfigError;

pub use claims::{Claim, ClaimSet, ID_CLAIM, RESERVED_CLAIMS, ROLES_CLAIM};
pub use config::{JwtConfig, MIN_SECRET_LEN, RECOMMENDED_SECRET_LEN};
pub use guard::{extract_bearer, BearerGuard};
pub use issuer::{Audience, SignedToken, TokenIssuer, TokenPayload};
pub use key::SigningKey;
pub use verifier::{TokenVerifier, VerificationResult, VerifiedToken};

/// Build an issuer and a verifier that share one copy of the key material.
pub fn token_pair(config: &JwtConfig) -> Result<(TokenIssuer, TokenVerifier), ConfigError> {
    config.validate()?;
    let key = SigningKey::from_secret(&config.secret).map_err(|_| ConfigError::Invalid {
        key: "Secret".to_string(),
        value: "<redacted>".to_string(),
    })?;
    let key = Arc::new(key);
    Ok((
        TokenIssuer::with_key(Arc::clone(&key), config),
        TokenVerifier::with_key(key, config),
    ))
}
