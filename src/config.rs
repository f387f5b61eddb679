//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use std::fmt;

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SIGNATURE_SECRET` (required): shared secret for request signatures
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `DATABASE_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `SIGNATURE_TOLERANCE_SECS` (optional): maximum clock skew accepted for `X-Timestamp`
/// - `MAX_BODY_BYTES` (optional): largest signed body the server will buffer, defaults to 1 MiB
#[derive(Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    pub signature_secret: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    /// Replay window for signed requests. Unset means timestamps are not checked.
    #[serde(default)]
    pub signature_tolerance_secs: Option<u64>,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

// Keeps the secret and credentials in the connection string out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"<redacted>")
            .field("signature_secret", &"<redacted>")
            .field("server_port", &self.server_port)
            .field("database_max_connections", &self.database_max_connections)
            .field("signature_tolerance_secs", &self.signature_tolerance_secs)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

/// Errors raised while loading [`Config`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] envy::Error),

    #[error("SIGNATURE_SECRET must not be empty")]
    EmptySecret,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    /// - `SIGNATURE_SECRET` is blank
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        Self::from_vars(std::env::vars())
    }

    /// Build a config from an explicit set of `KEY=value` pairs.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        // Field names are automatically converted: database_url -> DATABASE_URL
        let config = envy::from_iter::<_, Config>(vars)?;

        if config.signature_secret.trim().is_empty() {
            return Err(ConfigError::EmptySecret);
        }

        Ok(config)
    }
}
