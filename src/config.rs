//! Runtime settings
//!
//! Values come from the process environment (a `.env` file is loaded by the
//! binary through `dotenv` before this runs). Command-line flags may override
//! individual fields afterwards.

use crate::error::{QueryError, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://database/sample_database.db";

#[derive(Debug, Clone)]
pub struct Settings {
    /// SQLite connection URL
    pub database_url: String,

    pub host: String,
    pub port: u16,

    /// Upper bound on pooled connections
    pub max_connections: u32,

    /// How long a request waits for a pooled connection before failing
    pub acquire_timeout: Duration,

    /// How long the server waits for a complete HTTP request
    pub read_timeout: Duration,

    /// Log every executed statement at info level
    pub echo_sql: bool,

    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_connections: 10,
            acquire_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(5),
            echo_sql: false,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Build settings from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            host: lookup("API_HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "API_PORT")?.unwrap_or(defaults.port),
            max_connections: parse_var(&lookup, "DB_MAX_CONNECTIONS")?
                .unwrap_or(defaults.max_connections),
            acquire_timeout: parse_var(&lookup, "DB_ACQUIRE_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.acquire_timeout),
            read_timeout: parse_var(&lookup, "REQUEST_READ_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.read_timeout),
            echo_sql: lookup("DATABASE_ECHO")
                .map(|v| parse_flag("DATABASE_ECHO", &v))
                .transpose()?
                .unwrap_or(defaults.echo_sql),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| QueryError::Config(format!("{} = '{}': {}", key, raw, e))),
        None => Ok(None),
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(QueryError::Config(format!(
            "{} = '{}': expected a boolean",
            key, other
        ))),
    }
}
