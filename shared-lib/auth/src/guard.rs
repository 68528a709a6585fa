//! Authorization boundary for bearer credentials.

use chrono::{DateTime, Utc};
use error::AccessDenied;

use crate::verifier::{TokenVerifier, VerifiedToken};

const BEARER_SCHEME: &str = "bearer";

/// Pull the token out of an `Authorization` header value.
pub fn extract_bearer(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Gates access on a valid bearer token and, optionally, a role.
#[derive(Debug, Clone)]
pub struct BearerGuard {
    verifier: TokenVerifier,
}

impl BearerGuard {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self { verifier }
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Verify the bearer token in `header_value`.
    pub fn authenticate(
        &self,
        header_value: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<VerifiedToken, AccessDenied> {
        let token = header_value
            .and_then(extract_bearer)
            .ok_or(AccessDenied::MissingToken)?;
        Ok(self.verifier.verify(token, now)?)
    }

    /// Verify the bearer token and require `role` among its roles.
    pub fn authorize(
        &self,
        header_value: Option<&str>,
        role: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifiedToken, AccessDenied> {
        let verified = self.authenticate(header_value, now)?;
        if !verified.has_role(role) {
            tracing::warn!(identity_id = %verified.identity_id, role, "Missing required role");
            return Err(AccessDenied::Forbidden {
                required: role.to_string(),
            });
        }
        Ok(verified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::issuer::TokenIssuer;
    use chrono::TimeZone;
    use error::TokenRejection;

    fn setup() -> (TokenIssuer, BearerGuard) {
        let config = JwtConfig::new("s3cr3t-key-of-sufficient-length", "id-svc", 1);
        let issuer = TokenIssuer::new(&config).unwrap();
        let guard = BearerGuard::new(TokenVerifier::new(&config).unwrap());
        (issuer, guard)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract_bearer("bearer   abc"), Some("abc"));
        assert_eq!(extract_bearer("Basic dXNlcjpwYXNz"), None);
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("abc.def.ghi"), None);
    }

    #[test]
    fn test_authorize_with_role() {
        let (issuer, guard) = setup();
        let token = issuer
            .issue("U1", &["admin"], &Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
            .unwrap();
        let header = format!("Bearer {}", token);

        let verified = guard.authorize(Some(&header), "admin", now()).unwrap();
        assert_eq!(verified.identity_id, "U1");

        assert_eq!(
            guard.authorize(Some(&header), "editor", now()),
            Err(AccessDenied::Forbidden {
                required: "editor".to_string()
            })
        );
    }

    #[test]
    fn test_missing_and_invalid_token() {
        let (_, guard) = setup();
        assert_eq!(guard.authenticate(None, now()), Err(AccessDenied::MissingToken));
        assert_eq!(
            guard.authenticate(Some("Bearer garbage"), now()),
            Err(AccessDenied::InvalidToken(TokenRejection::Malformed))
        );
    }
}
