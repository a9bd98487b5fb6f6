//! Application configuration loaded from environment variables.

use std::time::Duration;

use fulfillment::{FulfillmentConfig, ReservationMode};
use thiserror::Error;

/// An environment variable held a value that could not be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid value for {name}: {value:?} ({reason})")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
    pub reason: String,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` — `json` for JSON lines, anything else for text
/// - `DATABASE_URL` — PostgreSQL; the in-memory store is used when unset
/// - `REDIS_URL` — Redis TTL cache (`redis` feature); in-memory when unset
/// - `RESERVATION_MODE` — `best_effort` (default) or `atomic`
/// - `RESERVATION_TTL_SECS` — reservation lifetime (default: `1800`)
/// - `LOW_STOCK_THRESHOLD` — low-stock alert level (default: `10`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub fulfillment: FulfillmentConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let mut fulfillment = defaults.fulfillment;
        if let Some(mode) = var("RESERVATION_MODE") {
            fulfillment.reservation_mode = mode
                .parse::<ReservationMode>()
                .map_err(|e| invalid("RESERVATION_MODE", &mode, e))?;
        }
        if let Some(secs) = var("RESERVATION_TTL_SECS") {
            let secs: u64 = parse("RESERVATION_TTL_SECS", &secs)?;
            fulfillment.reservation_ttl = Duration::from_secs(secs.max(1));
        }
        if let Some(threshold) = var("LOW_STOCK_THRESHOLD") {
            fulfillment.low_stock_threshold = parse("LOW_STOCK_THRESHOLD", &threshold)?;
        }

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: match var("PORT") {
                Some(port) => parse("PORT", &port)?,
                None => defaults.port,
            },
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match var("LOG_FORMAT") {
                Some(format) if format.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
            database_url: var("DATABASE_URL"),
            redis_url: var("REDIS_URL"),
            fulfillment,
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            redis_url: None,
            fulfillment: FulfillmentConfig::default(),
        }
    }
}

fn parse<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| invalid(name, value, e))
}

fn invalid(name: &'static str, value: &str, reason: impl std::fmt::Display) -> ConfigError {
    ConfigError {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
