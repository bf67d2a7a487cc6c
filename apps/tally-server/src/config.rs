//! Server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//! A `.env` file in the working directory is read first by `main`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use tally_core::share::DEFAULT_SHARE_LINK_DAYS;
use tally_core::validation::MAX_TAX_PERCENT;
use tally_core::{TaxRate, DEFAULT_TAX_RATE_PERCENT};

/// Longest share link lifetime accepted (ten years).
pub const MAX_SHARE_LINK_DAYS: i64 = 3650;

/// Tally server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Public base URL used to build share links
    pub base_url: String,

    /// Symbol handed to statement and public views
    pub currency_symbol: String,

    /// Business name shown on statements
    pub company_name: String,

    /// Tax percentage applied when a form gives none (15 means 15%)
    pub default_tax_rate: Decimal,

    /// Share link lifetime in days
    pub share_link_days: i64,

    /// SQLite pool size
    pub db_max_connections: u32,

    /// Take the viewer address from `X-Forwarded-For`. Only enable behind a
    /// reverse proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            http_port: 8080,
            database_path: PathBuf::from("./tally.db"),
            base_url: "http://localhost:8080".to_string(),
            currency_symbol: "$".to_string(),
            company_name: "Tally".to_string(),
            default_tax_rate: Decimal::from(DEFAULT_TAX_RATE_PERCENT),
            share_link_days: DEFAULT_SHARE_LINK_DAYS,
            db_max_connections: 5,
            trust_forwarded_for: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = ServerConfig::default();

        let config = ServerConfig {
            http_port: parse_or(&lookup, "TALLY_HTTP_PORT", defaults.http_port)?,

            database_path: lookup("TALLY_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            base_url: lookup("TALLY_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),

            currency_symbol: lookup("TALLY_CURRENCY_SYMBOL").unwrap_or(defaults.currency_symbol),

            company_name: lookup("TALLY_COMPANY_NAME").unwrap_or(defaults.company_name),

            default_tax_rate: parse_or(
                &lookup,
                "TALLY_DEFAULT_TAX_RATE",
                defaults.default_tax_rate,
            )?,

            share_link_days: parse_or(
                &lookup,
                "TALLY_SHARE_LINK_DAYS",
                defaults.share_link_days,
            )?,

            db_max_connections: parse_or(
                &lookup,
                "TALLY_DB_MAX_CONNECTIONS",
                defaults.db_max_connections,
            )?,

            trust_forwarded_for: parse_or(
                &lookup,
                "TALLY_TRUST_PROXY",
                defaults.trust_forwarded_for,
            )?,
        };

        let tax = config.default_tax_rate;
        if tax.is_sign_negative() || tax > MAX_TAX_PERCENT {
            return Err(ConfigError::InvalidValue("TALLY_DEFAULT_TAX_RATE".to_string()));
        }
        if !(1..=MAX_SHARE_LINK_DAYS).contains(&config.share_link_days) {
            return Err(ConfigError::InvalidValue("TALLY_SHARE_LINK_DAYS".to_string()));
        }
        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("TALLY_DB_MAX_CONNECTIONS".to_string()));
        }
        if config.base_url.is_empty() {
            return Err(ConfigError::MissingRequired("TALLY_BASE_URL".to_string()));
        }

        Ok(config)
    }

    /// Default tax as a rate.
    pub fn default_tax(&self) -> TaxRate {
        TaxRate::from_percentage(self.default_tax_rate)
    }

    /// Lifetime of newly issued share links.
    pub fn share_lifetime(&self) -> chrono::Duration {
        chrono::Duration::days(self.share_link_days)
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
