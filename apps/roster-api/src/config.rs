//! Application configuration loaded from environment variables.
//!
//! Fail-fast: required variables must be present and valid or the process
//! exits with a clear message before any listener opens.

use std::env;
use thiserror::Error;

/// Configuration errors during environment loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address. Default: 0.0.0.0.
    pub host: String,
    /// Server listen port. Default: 8080.
    pub port: u16,
    /// Opaque bearer token expected in `X-Auth` on ingestion routes.
    pub ingestion_token: String,
    /// Tracing filter directive. Default: "info".
    pub rust_log: String,
    /// Postgres connection string; in-memory store when unset.
    pub database_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required: `INGESTION_TOKEN`. Optional: `HOST`, `PORT`, `RUST_LOG`,
    /// `DATABASE_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env if present (development only).
        let _ = dotenvy::dotenv();

        let ingestion_token = env::var("INGESTION_TOKEN")
            .map_err(|_| ConfigError::MissingVar("INGESTION_TOKEN".to_string()))?;
        if ingestion_token.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                var: "INGESTION_TOKEN".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue {
                var: "PORT".to_string(),
                message: format!("{e}"),
            })?;
        if port == 0 {
            return Err(ConfigError::InvalidValue {
                var: "PORT".to_string(),
                message: "Port must be between 1 and 65535".to_string(),
            });
        }

        Ok(Self {
            host,
            port,
            ingestion_token,
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
        })
    }

    /// The server bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
