use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub inventory: InventoryConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub frontend_url: String,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// When unset the server falls back to the in-memory store.
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expires_in_secs: i64,
    pub cookie_secure: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    pub default_per_page: u32,
    pub max_per_page: u32,
    /// Window in which the client serves identical list requests from cache.
    pub client_dedup_ms: u64,
}

const DEV_JWT_SECRET: &str = "gati-dev-secret-change-me";

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_name = env::var("APP_ENV").or_else(|_| env::var("NODE_ENV"));
        let environment = match env_name.as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        let config = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()?;

        config.validate()?;
        Ok(config)
    }

    fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        // Server overrides
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().map_err(|_| ConfigError::Invalid { name: "PORT", value: v })?;
        }
        if let Ok(v) = env::var("FRONTEND_URL") {
            self.server.frontend_url = v.trim_end_matches('/').to_string();
            self.security.cors_origins = vec![self.server.frontend_url.clone()];
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            if !v.trim().is_empty() {
                self.database.url = Some(v);
            }
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRES_IN") {
            self.security.jwt_expires_in_secs = parse_duration_secs(&v)
                .ok_or(ConfigError::Invalid { name: "JWT_EXPIRES_IN", value: v })?;
        }
        if let Ok(v) = env::var("SECURITY_COOKIE_SECURE") {
            self.security.cookie_secure = v.parse().unwrap_or(self.security.cookie_secure);
        }

        // Inventory overrides
        if let Ok(v) = env::var("INVENTORY_DEFAULT_PER_PAGE") {
            self.inventory.default_per_page = v.parse().unwrap_or(self.inventory.default_per_page);
        }
        if let Ok(v) = env::var("INVENTORY_MAX_PER_PAGE") {
            self.inventory.max_per_page = v.parse().unwrap_or(self.inventory.max_per_page);
        }

        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        if self.environment == Environment::Production && self.security.jwt_secret == DEV_JWT_SECRET {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        if !(1..=MAX_JWT_TTL_SECS).contains(&self.security.jwt_expires_in_secs) {
            return Err(ConfigError::Invalid {
                name: "JWT_EXPIRES_IN",
                value: self.security.jwt_expires_in_secs.to_string(),
            });
        }
        if self.inventory.max_per_page == 0 || self.inventory.default_per_page == 0 {
            return Err(ConfigError::Invalid {
                name: "INVENTORY_MAX_PER_PAGE",
                value: self.inventory.max_per_page.to_string(),
            });
        }
        Ok(())
    }

    /// Development defaults, also used by tests.
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3001,
                frontend_url: "http://localhost:3000".to_string(),
                enable_request_logging: true,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                jwt_secret: DEV_JWT_SECRET.to_string(),
                jwt_expires_in_secs: 8 * 60 * 60,
                cookie_secure: false,
                cors_origins: vec!["http://localhost:3000".to_string()],
            },
            inventory: InventoryConfig {
                default_per_page: 25,
                max_per_page: 100,
                client_dedup_ms: 2_000,
            },
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config.security.cookie_secure = true;
        config
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 3001,
                frontend_url: "https://gati.example.com".to_string(),
                enable_request_logging: false,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                // Must come from JWT_SECRET
                jwt_secret: String::new(),
                jwt_expires_in_secs: 60 * 60,
                cookie_secure: true,
                cors_origins: vec!["https://gati.example.com".to_string()],
            },
            inventory: InventoryConfig {
                default_per_page: 25,
                max_per_page: 100,
                client_dedup_ms: 2_000,
            },
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

/// Longest accepted session lifetime.
pub const MAX_JWT_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// Parses `90`, `30s`, `30m`, `8h` and `1d` into seconds. Values above
/// [`MAX_JWT_TTL_SECS`] are rejected.
pub fn parse_duration_secs(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let (digits, unit) = match raw.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&raw[..idx], Some(c.to_ascii_lowercase())),
        _ => (raw, None),
    };
    let value: i64 = digits.trim().parse().ok()?;
    if value <= 0 {
        return None;
    }
    let multiplier = match unit {
        None | Some('s') => 1,
        Some('m') => 60,
        Some('h') => 60 * 60,
        Some('d') => 24 * 60 * 60,
        Some(_) => return None,
    };
    value.checked_mul(multiplier).filter(|secs| *secs <= MAX_JWT_TTL_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(config.validate().is_ok());
        assert_eq!(config.inventory.default_per_page, 25);
        assert!(!config.security.cookie_secure);
        assert!(config.database.url.is_none());
    }

    #[test]
    fn test_production_requires_secret() {
        let config = AppConfig::production();
        assert!(matches!(config.validate(), Err(ConfigError::Missing("JWT_SECRET"))));
    }

    #[test]
    fn parses_expiry_forms() {
        assert_eq!(parse_duration_secs("90"), Some(90));
        assert_eq!(parse_duration_secs("30m"), Some(1800));
        assert_eq!(parse_duration_secs("8h"), Some(28_800));
        assert_eq!(parse_duration_secs("1d"), Some(86_400));
        assert_eq!(parse_duration_secs("1w"), None);
        assert_eq!(parse_duration_secs("0"), None);
        assert_eq!(parse_duration_secs(""), None);
    }

    #[test]
    fn expiry_is_capped_at_a_year() {
        assert_eq!(parse_duration_secs("365d"), Some(MAX_JWT_TTL_SECS));
        assert_eq!(parse_duration_secs("366d"), None);
        assert_eq!(parse_duration_secs("9223372036854775807"), None);
        assert_eq!(parse_duration_secs("9999999999999999d"), None);

        let mut config = AppConfig::development();
        config.security.jwt_expires_in_secs = MAX_JWT_TTL_SECS + 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { name: "JWT_EXPIRES_IN", .. })));
    }
}
