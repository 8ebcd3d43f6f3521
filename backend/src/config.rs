//! Configuration management for the Scrap Link backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with SCRAPLINK_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Persistence gateway configuration
    pub database: DatabaseConfig,

    /// Token verification and admin sign-in
    pub auth: AuthConfig,

    /// Transactional email (EmailJS) configuration
    pub email: EmailConfig,

    /// Price prediction service configuration
    pub price_oracle: PriceOracleConfig,

    /// Notification worker retry policy
    pub notifications: NotificationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

/// Which gateway implementation to use
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GatewayBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub backend: GatewayBackend,

    /// PostgreSQL connection URL
    #[serde(default)]
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// HS256 secret shared with the hosted auth provider
    pub jwt_secret: String,

    /// Admin token lifetime in seconds
    pub admin_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    pub api_url: String,
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub template_id: String,
    #[serde(default)]
    pub public_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PriceOracleConfig {
    /// Base URL of the prediction service; empty disables predictions
    #[serde(default)]
    pub base_url: String,

    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("SCRAPLINK_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.backend", "postgres")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("auth.admin_token_expiry", 28800)?
            .set_default("email.api_url", "https://api.emailjs.com/api/v1.0/email/send")?
            .set_default("price_oracle.timeout_secs", 15)?
            .set_default("notifications.max_attempts", 3)?
            .set_default("notifications.initial_backoff_ms", 500)?
            .set_default("notifications.max_backoff_ms", 8000)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (SCRAPLINK_ prefix)
            .add_source(
                Environment::with_prefix("SCRAPLINK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for Config {
    /// Local settings: in-memory gateway, email disabled, no price oracle
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig {
                backend: GatewayBackend::Memory,
                url: String::new(),
                max_connections: 10,
                min_connections: 2,
            },
            auth: AuthConfig {
                jwt_secret: "development-secret-key".to_string(),
                admin_token_expiry: 28800,
            },
            email: EmailConfig {
                api_url: "https://api.emailjs.com/api/v1.0/email/send".to_string(),
                service_id: String::new(),
                template_id: String::new(),
                public_key: String::new(),
            },
            price_oracle: PriceOracleConfig {
                base_url: String::new(),
                timeout_secs: 15,
            },
            notifications: NotificationConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 8000,
        }
    }
}
