use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration is invalid: {0}")]
    Invalid(String),
}

#[derive(Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "crate::config::defaults::default_jwt_kid")]
    pub jwt_kid: String,
    #[serde(default)]
    pub previous_jwt_secrets: Vec<String>,
    #[serde(default)]
    pub previous_jwt_kids: Vec<String>,
    #[serde(default = "crate::config::defaults::default_jwt_expiration_seconds")]
    pub jwt_expiration_seconds: u64,
    #[serde(default = "crate::config::defaults::default_jwt_remember_expiration_seconds")]
    pub jwt_remember_expiration_seconds: u64,
    #[serde(default = "crate::config::defaults::default_refresh_token_expiration_days")]
    pub refresh_token_expiration_days: u64,
    pub issuer: String,
    pub audience: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_kid", &self.jwt_kid)
            .field("previous_jwt_secrets", &"[REDACTED]")
            .field("previous_jwt_kids", &self.previous_jwt_kids)
            .field("jwt_expiration_seconds", &self.jwt_expiration_seconds)
            .field(
                "jwt_remember_expiration_seconds",
                &self.jwt_remember_expiration_seconds,
            )
            .field(
                "refresh_token_expiration_days",
                &self.refresh_token_expiration_days,
            )
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

impl AuthConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.previous_jwt_kids.len() != self.previous_jwt_secrets.len() {
            return Err(ConfigError::Invalid(
                "previous_jwt_kids and previous_jwt_secrets must have the same length".to_string(),
            ));
        }

        if self.previous_jwt_kids.iter().any(|kid| kid == &self.jwt_kid) {
            return Err(ConfigError::Invalid(
                "previous_jwt_kids must not contain the active jwt_kid".to_string(),
            ));
        }

        if self.jwt_expiration_seconds == 0 || self.jwt_remember_expiration_seconds == 0 {
            return Err(ConfigError::Invalid(
                "token expirations must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
