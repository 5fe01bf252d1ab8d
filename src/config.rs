//! Environment-driven configuration for the server binary.

use std::env;

const DEFAULT_DATABASE_URL: &str = "sqlite://shopkit.db?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:1234";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Absent means the cache shim runs disabled.
    pub redis_url: Option<String>,
    pub bind_addr: String,
    pub max_connections: u32,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            max_connections: env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
        }
    }
}
