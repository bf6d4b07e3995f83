//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// A Postgres URL, or `memory://` for the in-process store.
    pub database_url: String,
    pub log_level: Level,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub payment_failure_rate: f64,
    pub payment_delay: Duration,
    pub checkout_timeout: Duration,
    pub frontend_url: String,
    pub seed_sample_data: bool,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Database Settings ---
        let bind_address_str =
            lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:5000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Auth Settings ---
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingVar("JWT_SECRET".to_string()))?;
        let token_ttl = chrono::Duration::hours(parse_or(&lookup, "TOKEN_TTL_HOURS", 24_i64)?);

        // --- Checkout and Payment Settings ---
        let payment_failure_rate = parse_or(&lookup, "PAYMENT_FAILURE_RATE", 0.05_f64)?;
        if !(0.0..=1.0).contains(&payment_failure_rate) {
            return Err(ConfigError::InvalidValue(
                "PAYMENT_FAILURE_RATE".to_string(),
                format!("{} is outside [0, 1]", payment_failure_rate),
            ));
        }
        let payment_delay = Duration::from_millis(parse_or(&lookup, "PAYMENT_DELAY_MS", 500_u64)?);
        let checkout_timeout =
            Duration::from_millis(parse_or(&lookup, "CHECKOUT_TIMEOUT_MS", 10_000_u64)?);

        // --- Web Settings ---
        let frontend_url =
            lookup("FRONTEND_URL").unwrap_or_else(|| "http://localhost:3000".to_string());
        let seed_sample_data = parse_or(&lookup, "SEED_SAMPLE_DATA", true)?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            jwt_secret,
            token_ttl,
            payment_failure_rate,
            payment_delay,
            checkout_timeout,
            frontend_url,
            seed_sample_data,
        })
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with("memory://")
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
    }
}
