//! Signing key material.

use error::{TokenError, TokenRejection};
use hmac::{Hmac, Mac};
use jwt::header::HeaderType;
use jwt::{AlgorithmType, Header, SignWithKey, Token, VerifyWithKey};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// The symmetric secret and the fixed algorithm it is used with.
///
/// The raw UTF-8 bytes of the configured secret are the HMAC key.
#[derive(Clone)]
pub struct SigningKey {
    mac: HmacSha256,
}

impl SigningKey {
    /// Build key material from a secret.
    pub fn from_secret(secret: &str) -> Result<Self, TokenError> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| {
            tracing::error!("Failed to create HMAC key: {}", e);
            TokenError::CreationFailed("invalid HMAC key".to_string())
        })?;
        Ok(Self { mac })
    }

    /// Signing algorithm, always HS256.
    pub fn algorithm(&self) -> AlgorithmType {
        AlgorithmType::Hs256
    }

    /// Header written on every token.
    pub fn header(&self) -> Header {
        Header {
            algorithm: self.algorithm(),
            type_: Some(HeaderType::JsonWebToken),
            ..Default::default()
        }
    }

    /// Sign `claims` and serialize to compact `header.payload.signature` form.
    pub fn sign<C: Serialize>(&self, claims: C) -> Result<String, TokenError> {
        let token = Token::new(self.header(), claims)
            .sign_with_key(&self.mac)
            .map_err(|e| {
                tracing::error!("Failed to encode JWT: {}", e);
                TokenError::CreationFailed(e.to_string())
            })?;
        Ok(token.as_str().to_owned())
    }

    /// Parse a compact token, check its signature, then decode the payload.
    ///
    /// Only segment structure and encoding are inspected before the MAC
    /// check, which is constant-time. A signed payload that does not fit `C`
    /// is malformed.
    pub fn open<C>(&self, token: &str) -> Result<C, TokenRejection>
    where
        C: DeserializeOwned,
    {
        let unverified: Token<Header, Map<String, Value>, _> =
            Token::parse_unverified(token).map_err(|e| {
                tracing::debug!("Unparseable token: {}", e);
                TokenRejection::Malformed
            })?;

        let verified: Token<Header, Map<String, Value>, _> =
            unverified.verify_with_key(&self.mac).map_err(|e| {
                tracing::debug!("Signature check failed: {}", e);
                TokenRejection::BadSignature
            })?;

        serde_json::from_value(Value::Object(verified.claims().clone())).map_err(|e| {
            tracing::debug!("Signed payload has unexpected shape: {}", e);
            TokenRejection::Malformed
        })
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}
