use std::time::Duration;

use crate::error::ConfigError;
use crate::users::Role;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub redis: RedisSettings,
    pub jwt: JwtSettings,
    pub session: SessionSettings,
    pub cache: CacheSettings,
    #[serde(default)]
    pub seed_users: Vec<SeedUser>,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct RedisSettings {
    pub url: String,
}

/// JWT signing settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub expiration_seconds: i64, // 36000 = 10 hours
    pub issuer: String,
}

/// Server-side session lifetime in the registry
#[derive(serde::Deserialize, Clone)]
pub struct SessionSettings {
    pub ttl_seconds: u64,
}

impl SessionSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct CacheSettings {
    pub max_entries: u64,
}

/// Account created at startup when missing from the credential store
#[derive(serde::Deserialize, Clone)]
pub struct SeedUser {
    pub username: String,
    pub password: String,
    pub role: Role,
}

/// Reads `configuration.{yaml,toml,json}` from the working directory if present,
/// then applies `APP__SECTION__KEY` environment overrides.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .set_default("application.host", "127.0.0.1")?
        .set_default("application.port", 8080)?
        .set_default("redis.url", "redis://127.0.0.1:6379")?
        .set_default("jwt.expiration_seconds", 36000)?
        .set_default("jwt.issuer", "tenantmanager")?
        .set_default("session.ttl_seconds", 36000)?
        .set_default("cache.max_entries", 1000)?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;
    let settings = settings.try_deserialize::<Settings>()?;
    settings.validate()?;
    Ok(settings)
}

impl Settings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt.secret".to_string()));
        }
        if self.session.ttl_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "session.ttl_seconds must be positive".to_string(),
            ));
        }
        if self.cache.max_entries == 0 {
            return Err(ConfigError::InvalidValue(
                "cache.max_entries must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
