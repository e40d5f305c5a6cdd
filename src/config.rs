//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::domain::Currency;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Secret used to sign access tokens
    pub jwt_secret: String,

    /// Access token lifetime in minutes
    pub jwt_ttl_minutes: i64,

    /// Public base URL, used to build verification links
    pub server_url: String,

    /// Balance granted to every new account at signup
    pub opening_balance: Decimal,

    /// Currency of new accounts
    pub opening_currency: Currency,

    /// Upper bound on one transfer unit of work
    pub transfer_timeout: Duration,

    /// Whole-transfer retry attempts on transient store errors
    pub transfer_max_retries: u32,

    /// Seed demo users at startup
    pub seed_demo_users: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let jwt_secret =
            env::var("JWT_SECRET").map_err(|_| ConfigError::MissingEnv("JWT_SECRET"))?;

        let jwt_ttl_minutes = env::var("JWT_TTL_MINUTES")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("JWT_TTL_MINUTES"))?;

        let server_url =
            env::var("SERVER_URL").unwrap_or_else(|_| format!("http://{host}:{port}"));

        let opening_balance = Decimal::from_str(
            &env::var("OPENING_BALANCE").unwrap_or_else(|_| "800.00".to_string()),
        )
        .map_err(|_| ConfigError::InvalidValue("OPENING_BALANCE"))?;

        let opening_currency = env::var("OPENING_CURRENCY")
            .unwrap_or_else(|_| "ILS".to_string())
            .parse::<Currency>()
            .map_err(|_| ConfigError::InvalidValue("OPENING_CURRENCY"))?;

        let transfer_timeout_ms: u64 = env::var("TRANSFER_TIMEOUT_MS")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("TRANSFER_TIMEOUT_MS"))?;

        let transfer_max_retries = env::var("TRANSFER_MAX_RETRIES")
            .unwrap_or_else(|_| "3".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("TRANSFER_MAX_RETRIES"))?;

        let seed_demo_users = env::var("SEED_DB")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            jwt_secret,
            jwt_ttl_minutes,
            server_url,
            opening_balance,
            opening_currency,
            transfer_timeout: Duration::from_millis(transfer_timeout_ms),
            transfer_max_retries,
            seed_demo_users,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
