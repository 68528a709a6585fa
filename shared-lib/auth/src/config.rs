//! Token signing configuration.

use error::ConfigError;
use serde::{Deserialize, Serialize};

/// Smallest accepted HMAC-SHA256 secret, in bytes.
pub const MIN_SECRET_LEN: usize = 16;

/// Secret length below which startup logs a warning.
pub const RECOMMENDED_SECRET_LEN: usize = 32;

/// JWT configuration.
///
/// Loaded once at startup and handed to the issuer and verifier by value;
/// nothing mutates it afterwards.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// Token issuer, also used as the audience
    pub issuer: String,
    /// Token validity in calendar days
    pub expiration_in_days: u32,
    /// Tolerance applied to the expiry check
    #[serde(default)]
    pub clock_skew_secs: u64,
}

#[derive(Deserialize)]
struct AppSettings {
    #[serde(rename = "Jwt")]
    jwt: Option<JwtConfig>,
}

impl JwtConfig {
    /// Create a new JWT configuration.
    pub fn new(secret: impl Into<String>, issuer: impl Into<String>, expiration_in_days: u32) -> Self {
        Self {
            secret: secret.into(),
            issuer: issuer.into(),
            expiration_in_days,
            clock_skew_secs: 0,
        }
    }

    /// Set the clock skew tolerance.
    pub fn with_clock_skew(mut self, secs: u64) -> Self {
        self.clock_skew_secs = secs;
        self
    }

    /// Load and validate from `JWT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load and validate using an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| ConfigError::Missing(key.to_string()));

        let days = required("JWT_EXPIRATION_IN_DAYS")?;
        let expiration_in_days = days.trim().parse().map_err(|_| ConfigError::Invalid {
            key: "JWT_EXPIRATION_IN_DAYS".to_string(),
            value: days.clone(),
        })?;

        let clock_skew_secs = match lookup("JWT_CLOCK_SKEW_SECS") {
            Some(skew) => skew.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "JWT_CLOCK_SKEW_SECS".to_string(),
                value: skew.clone(),
            })?,
            None => 0,
        };

        let config = Self {
            secret: required("JWT_SECRET")?,
            issuer: required("JWT_ISSUER")?,
            expiration_in_days,
            clock_skew_secs,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load and validate the `"Jwt"` section of an appsettings JSON document.
    pub fn from_appsettings(json: &str) -> Result<Self, ConfigError> {
        let settings: AppSettings = serde_json::from_str(json).map_err(|e| ConfigError::Invalid {
            key: "Jwt".to_string(),
            value: e.to_string(),
        })?;
        let config = settings.jwt.ok_or_else(|| ConfigError::Missing("Jwt".to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        if self.secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::SecretTooShort {
                len: self.secret.len(),
                min: MIN_SECRET_LEN,
            });
        }
        if self.secret.len() < RECOMMENDED_SECRET_LEN {
            tracing::warn!(
                "JWT secret is shorter than recommended ({} bytes)",
                RECOMMENDED_SECRET_LEN
            );
        }
        if self.issuer.trim().is_empty() {
            return Err(ConfigError::EmptyIssuer);
        }
        if self.expiration_in_days == 0 {
            return Err(ConfigError::InvalidExpiration);
        }
        Ok(())
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("expiration_in_days", &self.expiration_in_days)
            .field("clock_skew_secs", &self.clock_skew_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_lookup() {
        let vars = env(&[
            ("JWT_SECRET", "s3cr3t-key-of-sufficient-length"),
            ("JWT_ISSUER", "id-svc"),
            ("JWT_EXPIRATION_IN_DAYS", "7"),
        ]);
        let config = JwtConfig::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.issuer, "id-svc");
        assert_eq!(config.expiration_in_days, 7);
        assert_eq!(config.clock_skew_secs, 0);
    }

    #[test]
    fn test_missing_secret_fails() {
        let vars = env(&[("JWT_ISSUER", "id-svc"), ("JWT_EXPIRATION_IN_DAYS", "7")]);
        let err = JwtConfig::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert_eq!(err, ConfigError::Missing("JWT_SECRET".to_string()));
    }

    #[test]
    fn test_bad_expiration_value() {
        let vars = env(&[
            ("JWT_SECRET", "s3cr3t-key-of-sufficient-length"),
            ("JWT_ISSUER", "id-svc"),
            ("JWT_EXPIRATION_IN_DAYS", "soon"),
        ]);
        let err = JwtConfig::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_validate_secret() {
        assert_eq!(
            JwtConfig::new("", "id-svc", 1).validate(),
            Err(ConfigError::EmptySecret)
        );
        assert_eq!(
            JwtConfig::new("short", "id-svc", 1).validate(),
            Err(ConfigError::SecretTooShort { len: 5, min: MIN_SECRET_LEN })
        );
        assert!(JwtConfig::new("0123456789abcdef", "id-svc", 1).validate().is_ok());
    }

    #[test]
    fn test_validate_issuer_and_expiration() {
        let secret = "s3cr3t-key-of-sufficient-length";
        assert_eq!(
            JwtConfig::new(secret, " ", 1).validate(),
            Err(ConfigError::EmptyIssuer)
        );
        assert_eq!(
            JwtConfig::new(secret, "id-svc", 0).validate(),
            Err(ConfigError::InvalidExpiration)
        );
    }

    #[test]
    fn test_from_appsettings() {
        let json = r#"{
            "Logging": { "LogLevel": { "Default": "Information" } },
            "Jwt": {
                "Secret": "s3cr3t-key-of-sufficient-length",
                "Issuer": "id-svc",
                "ExpirationInDays": 30
            }
        }"#;
        let config = JwtConfig::from_appsettings(json).unwrap();
        assert_eq!(config.issuer, "id-svc");
        assert_eq!(config.expiration_in_days, 30);

        let err = JwtConfig::from_appsettings("{}").unwrap_err();
        assert_eq!(err, ConfigError::Missing("Jwt".to_string()));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = JwtConfig::new("s3cr3t-key-of-sufficient-length", "id-svc", 1);
        let debug = format!("{:?}", config);
        assert!(!debug.contains("s3cr3t"));
        assert!(debug.contains("id-svc"));
    }
}
