//! Token issuance.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Days, TimeZone, Utc};
use error::{ConfigError, TokenError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::claims::ClaimSet;
use crate::config::JwtConfig;
use crate::key::SigningKey;

/// `aud` as it appears on the wire: one string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Audience::One(value) => value == audience,
            Audience::Many(values) => values.iter().any(|v| v == audience),
        }
    }
}

/// Token payload: the claim members plus the registered `iss`, `aud`, `exp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPayload {
    #[serde(flatten)]
    pub claims: Map<String, Value>,
    pub iss: String,
    pub aud: Audience,
    /// Expiry as Unix seconds
    pub exp: i64,
}

/// A serialized, signed token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignedToken(String);

impl SignedToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SignedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SignedToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Mints signed tokens for verified identities.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    key: Arc<SigningKey>,
    issuer: String,
    expiration_in_days: u32,
}

impl TokenIssuer {
    /// Create an issuer from validated configuration.
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
            expiration_in_days: config.expiration_in_days,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Expiry for a token issued at `now`: calendar days added in `now`'s
    /// own time zone.
    pub fn expires_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<DateTime<Utc>, TokenError> {
        now.clone()
            .checked_add_days(Days::new(u64::from(self.expiration_in_days)))
            .map(|expiry| expiry.with_timezone(&Utc))
            .ok_or(TokenError::ExpiryOutOfRange)
    }

    /// Issue a token for `identity_id` carrying `roles` in the given order.
    ///
    /// Identical inputs and `now` give byte-identical tokens.
    pub fn issue<S, Tz>(
        &self,
        identity_id: &str,
        roles: &[S],
        now: &DateTime<Tz>,
    ) -> Result<SignedToken, TokenError>
    where
        S: AsRef<str>,
        Tz: TimeZone,
    {
        let claims = ClaimSet::for_identity(identity_id, roles);
        let expires_at = self.expires_at(now)?;

        let payload = TokenPayload {
            claims: claims.to_json_map(),
            iss: self.issuer.clone(),
            // The audience is the issuer; verifiers check it the same way.
            aud: Audience::One(self.issuer.clone()),
            exp: expires_at.timestamp(),
        };

        let token = self.key.sign(&payload)?;
        tracing::debug!(
            identity_id,
            roles = roles.len(),
            expires_at = %expires_at,
            "Issued token"
        );
        Ok(SignedToken(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use jwt::{Header, Token};
    use serde_json::json;

    fn config() -> JwtConfig {
        JwtConfig::new("s3cr3t-key-of-sufficient-length", "id-svc", 1)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn payload_of(token: &SignedToken) -> TokenPayload {
        let parsed: Token<Header, TokenPayload, _> = Token::parse_unverified(token.as_str()).unwrap();
        parsed.claims().clone()
    }

    #[test]
    fn test_issue_is_deterministic() {
        let issuer = TokenIssuer::new(&config()).unwrap();
        let a = issuer.issue("U1", &["admin", "editor"], &t0()).unwrap();
        let b = issuer.issue("U1", &["admin", "editor"], &t0()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_now_changes_only_expiry() {
        let issuer = TokenIssuer::new(&config()).unwrap();
        let a = issuer.issue("U1", &["admin"], &t0()).unwrap();
        let b = issuer
            .issue("U1", &["admin"], &(t0() + chrono::Duration::hours(1)))
            .unwrap();
        assert_ne!(a, b);

        let (pa, pb) = (payload_of(&a), payload_of(&b));
        assert_eq!(pa.claims, pb.claims);
        assert_eq!(pa.iss, pb.iss);
        assert_eq!(pb.exp - pa.exp, 3600);
    }

    #[test]
    fn test_payload_contents() {
        let issuer = TokenIssuer::new(&config()).unwrap();
        let token = issuer.issue("U1", &["admin", "editor"], &t0()).unwrap();
        let payload = payload_of(&token);

        assert_eq!(payload.iss, "id-svc");
        assert_eq!(payload.aud, Audience::One("id-svc".to_string()));
        assert_eq!(payload.exp, t0().timestamp() + 86_400);
        assert_eq!(payload.claims.get("id"), Some(&json!("U1")));
        assert_eq!(payload.claims.get("roles"), Some(&json!(["admin", "editor"])));
    }

    #[test]
    fn test_expiry_adds_calendar_days_in_local_zone() {
        let config = JwtConfig::new("s3cr3t-key-of-sufficient-length", "id-svc", 30);
        let issuer = TokenIssuer::new(&config).unwrap();
        let offset = FixedOffset::east_opt(9 * 3600).unwrap();
        let now = offset.with_ymd_and_hms(2024, 1, 31, 23, 0, 0).unwrap();

        let expiry = issuer.expires_at(&now).unwrap();
        assert_eq!(
            expiry,
            offset.with_ymd_and_hms(2024, 3, 1, 23, 0, 0).unwrap().with_timezone(&Utc)
        );
    }

    #[test]
    fn test_rejects_invalid_config() {
        let err = TokenIssuer::new(&JwtConfig::new("", "id-svc", 1)).unwrap_err();
        assert_eq!(err, ConfigError::EmptySecret);
    }

    #[test]
    fn test_signed_token_serializes_as_string() {
        let issuer = TokenIssuer::new(&config()).unwrap();
        let token = issuer.issue::<&str, _>("U1", &[], &t0()).unwrap();
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json, Value::String(token.to_string()));
    }
}
