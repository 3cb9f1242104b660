pub mod auth_config;
pub mod database_config;
pub mod defaults;
pub mod security_config;
pub mod store_config;
pub mod throttle_config;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

pub use auth_config::{AuthConfig, ConfigError};
pub use database_config::DatabaseConfig;
pub use security_config::SecurityConfig;
pub use store_config::StoreConfig;
pub use throttle_config::{DeviceLimits, ThrottleConfig};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "defaults::default_host")]
    pub host: String,
    #[serde(default = "defaults::default_port")]
    pub port: u16,
    #[serde(default = "defaults::default_environment")]
    pub environment: String,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub store: StoreConfig,
    pub auth: AuthConfig,
    pub security: SecurityConfig,
    #[serde(default)]
    pub throttle: ThrottleConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "defaults::default_logging_level")]
    pub level: String,
    #[serde(default = "defaults::default_logging_json_format")]
    pub json_format: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, Box<figment::Error>> {
        let mut config: Self = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Toml::file("config/development.toml").nested())
            .merge(Env::prefixed("APP_").split("__"))
            .merge(Env::prefixed("DATABASE_").split("__"))
            .merge(Env::prefixed("STORE_").split("__"))
            .merge(Env::prefixed("AUTH_").split("__"))
            .merge(Env::prefixed("SECURITY_").split("__"))
            .merge(Env::prefixed("THROTTLE_").split("__"))
            .merge(Env::prefixed("LOGGING_").split("__"))
            .merge(
                Env::raw()
                    .only(&["DATABASE_URL", "STORE_URL", "JWT_SECRET", "PORT"])
                    .map(|key| match key.as_str() {
                        "DATABASE_URL" => "database.url".into(),
                        "STORE_URL" => "store.url".into(),
                        "JWT_SECRET" => "auth.jwt_secret".into(),
                        "PORT" => "port".into(),
                        other => other.to_string().into(),
                    }),
            )
            .extract()
            .map_err(Box::new)?;

        config.store.url = defaults::normalize_optional_string(config.store.url);
        config.security.metrics_admin_token =
            defaults::normalize_optional_string(config.security.metrics_admin_token);

        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate JWT_SECRET is set and not a placeholder
        let jwt_secret = self.auth.jwt_secret.trim();
        if jwt_secret.is_empty() {
            return Err(ConfigError::Invalid(
                "JWT_SECRET must be set via environment variable".to_string(),
            ));
        }

        // Reject the insecure default placeholder (trim to catch spaces around it)
        if jwt_secret == "change-me-in-production" {
            return Err(ConfigError::Invalid(
                "JWT_SECRET must be set to a secure value, not the default placeholder".to_string(),
            ));
        }

        self.auth.validate()?;
        self.throttle.validate()
    }
}
