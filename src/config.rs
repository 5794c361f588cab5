//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 8083)
//! - `DATABASE_URL` - `PostgreSQL` connection string; the in-memory store is used when unset
//! - `DATABASE_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `NATS_URL` - NATS server for domain events; events are only logged when unset
//! - `SEED_DEMO_DATA` - Seed the demo catalog into an empty in-memory store (default: true);
//!   ignored when `DATABASE_URL` is set
//! - `SESSION_SECURE` - Mark the session cookie `Secure` (default: false)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub nats_url: Option<String>,
    pub seed_demo_data: bool,
    pub session_secure: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 8083,
            database_url: None,
            database_max_connections: 10,
            nats_url: None,
            seed_demo_data: true,
            session_secure: false,
        }
    }
}

impl Config {
    /// Load configuration from the environment, reading `.env` first if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let optional = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Ok(Self {
            host: parse_or(&optional, "HOST", defaults.host)?,
            port: parse_or(&optional, "PORT", defaults.port)?,
            database_url: optional("DATABASE_URL"),
            database_max_connections: parse_or(&optional, "DATABASE_MAX_CONNECTIONS", defaults.database_max_connections)?,
            nats_url: optional("NATS_URL"),
            seed_demo_data: flag_or(&optional, "SEED_DEMO_DATA", defaults.seed_demo_data)?,
            session_secure: flag_or(&optional, "SESSION_SECURE", defaults.session_secure)?,
        })
    }

    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Demo data only goes into the in-memory store.
    pub fn seeds_demo_catalog(&self) -> bool {
        self.seed_demo_data && self.database_url.is_none()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

fn flag_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> Result<bool, ConfigError> {
    match lookup(key).map(|v| v.to_ascii_lowercase()).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::InvalidEnvVar(key.to_string(), format!("expected a boolean, got '{other}'"))),
    }
}
