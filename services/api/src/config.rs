//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use jsonwebtoken::Algorithm;
use posh_training_core::{AuthorizationEntry, Identity};
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
    /// `None` runs the service on the in-process store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub store_timeout: Duration,
    /// Seed for the in-process allow-list.
    pub authorized_emails: Vec<AuthorizationEntry>,
    pub log_level: Level,
    pub secret_key: String,
    pub algorithm: Algorithm,
    pub access_token_ttl: chrono::Duration,
    pub allowed_origins: Vec<String>,
    pub quiz_max_score: i64,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // --- Server and Store Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = var("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let database_max_connections = parse_or("DATABASE_MAX_CONNECTIONS", &var, 5u32)?;
        let store_timeout = Duration::from_millis(parse_or("STORE_TIMEOUT_MS", &var, 5_000u64)?);

        let authorized_emails = match var("AUTHORIZED_EMAILS") {
            Some(raw) => parse_allow_list(&raw)?,
            None => Vec::new(),
        };

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Credential Settings ---
        let secret_key = var("SECRET_KEY")
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ConfigError::MissingVar("SECRET_KEY".to_string()))?;

        let algorithm_str = var("ALGORITHM").unwrap_or_else(|| "HS256".to_string());
        let algorithm = match algorithm_str.to_uppercase().as_str() {
            "HS256" => Algorithm::HS256,
            "HS384" => Algorithm::HS384,
            "HS512" => Algorithm::HS512,
            _ => {
                return Err(ConfigError::InvalidValue(
                    "ALGORITHM".to_string(),
                    format!("'{}' is not a supported HMAC algorithm", algorithm_str),
                ))
            }
        };

        let ttl_minutes: i64 = parse_or("ACCESS_TOKEN_EXPIRE_MINUTES", &var, 30)?;
        if ttl_minutes <= 0 {
            return Err(ConfigError::InvalidValue(
                "ACCESS_TOKEN_EXPIRE_MINUTES".to_string(),
                "must be positive".to_string(),
            ));
        }

        // --- HTTP and Quiz Settings ---
        let allowed_origins = var("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000,http://localhost:5173".to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        let quiz_max_score: i64 = parse_or("QUIZ_MAX_SCORE", &var, 10)?;
        if quiz_max_score < 0 {
            return Err(ConfigError::InvalidValue(
                "QUIZ_MAX_SCORE".to_string(),
                "must not be negative".to_string(),
            ));
        }

        Ok(Self {
            bind_address,
            database_url,
            database_max_connections,
            store_timeout,
            authorized_emails,
            log_level,
            secret_key,
            algorithm,
            access_token_ttl: chrono::Duration::minutes(ttl_minutes),
            allowed_origins,
            quiz_max_score,
        })
    }
}

fn parse_or<T>(key: &str, var: &impl Fn(&str) -> Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

/// Parses `a@x.org=Alice,b@y.org` into allow-list entries.
fn parse_allow_list(raw: &str) -> Result<Vec<AuthorizationEntry>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let (email, name) = match item.split_once('=') {
                Some((email, name)) => (email, Some(name.trim().to_string())),
                None => (item, None),
            };
            let email = Identity::parse(email).map_err(|e| {
                ConfigError::InvalidValue("AUTHORIZED_EMAILS".to_string(), e.to_string())
            })?;
            Ok(AuthorizationEntry {
                email,
                name: name.filter(|n| !n.is_empty()),
            })
        })
        .collect()
}
