use auth::JwtConfig;
use error::ConfigError;

/// Identity service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Token signing configuration
    pub jwt: JwtConfig,

    /// Service version
    pub version: String,
}

impl ServiceConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup
    ///
    /// `APPSETTINGS_PATH` points at an appsettings JSON document whose `Jwt`
    /// section is used; otherwise the `JWT_*` variables are read.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt = match lookup("APPSETTINGS_PATH") {
            Some(path) => {
                let json = std::fs::read_to_string(&path).map_err(|e| ConfigError::Invalid {
                    key: "APPSETTINGS_PATH".to_string(),
                    value: format!("{}: {}", path, e),
                })?;
                JwtConfig::from_appsettings(&json)?
            }
            None => JwtConfig::from_lookup(&lookup)?,
        };

        Ok(Self {
            jwt,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}
