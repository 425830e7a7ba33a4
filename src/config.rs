//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Which storage engine backs the shop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            _ => Err(ConfigError::InvalidValue("STORAGE_BACKEND")),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    pub storage_backend: StorageBackend,

    /// Database connection URL (required for the postgres backend)
    pub database_url: Option<String>,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Idle lifetime of a login session
    pub session_ttl_minutes: i64,

    /// Simulated card verification latency
    pub gateway_delay_ms: u64,

    /// Failed logins allowed per identifier before lockout
    pub login_max_attempts: u32,

    pub login_lockout_minutes: i64,

    pub bcrypt_cost: u32,

    pub seed_owner_username: String,
    pub seed_owner_email: String,
    /// Owner account is only seeded when this is set
    pub seed_owner_password: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            environment: "development".to_string(),
            storage_backend: StorageBackend::Memory,
            database_url: None,
            database_max_connections: 10,
            session_ttl_minutes: 120,
            gateway_delay_ms: 2000,
            login_max_attempts: 5,
            login_lockout_minutes: 15,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            seed_owner_username: "owner".to_string(),
            seed_owner_email: "owner@shopfront.local".to_string(),
            seed_owner_password: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.storage_backend,
        };

        let database_url = env::var("DATABASE_URL").ok();
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnv("DATABASE_URL"));
        }

        let bcrypt_cost = parse_or("BCRYPT_COST", defaults.bcrypt_cost)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::InvalidValue("BCRYPT_COST"));
        }

        let login_max_attempts = parse_or("LOGIN_MAX_ATTEMPTS", defaults.login_max_attempts)?;
        if login_max_attempts == 0 {
            return Err(ConfigError::InvalidValue("LOGIN_MAX_ATTEMPTS"));
        }

        Ok(Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_or("PORT", defaults.port)?,
            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            storage_backend,
            database_url,
            database_max_connections: parse_or(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            session_ttl_minutes: parse_or("SESSION_TTL_MINUTES", defaults.session_ttl_minutes)?,
            gateway_delay_ms: parse_or("GATEWAY_DELAY_MS", defaults.gateway_delay_ms)?,
            login_max_attempts,
            login_lockout_minutes: parse_or(
                "LOGIN_LOCKOUT_MINUTES",
                defaults.login_lockout_minutes,
            )?,
            bcrypt_cost,
            seed_owner_username: env::var("SEED_OWNER_USERNAME")
                .unwrap_or(defaults.seed_owner_username),
            seed_owner_email: env::var("SEED_OWNER_EMAIL").unwrap_or(defaults.seed_owner_email),
            seed_owner_password: env::var("SEED_OWNER_PASSWORD")
                .ok()
                .filter(|p| !p.is_empty()),
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session_ttl_minutes)
    }

    pub fn login_lockout(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.login_lockout_minutes)
    }

    pub fn gateway_delay(&self) -> Duration {
        Duration::from_millis(self.gateway_delay_ms)
    }
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue(name)),
        Err(_) => Ok(default),
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
