//! Storefront API configuration.
//!
//! Configuration is loaded from environment variables (after an optional
//! `.env` file) with fallback to defaults.

use std::env;
use std::str::FromStr;

use farmgate_core::checkout::CheckoutPolicy;
use farmgate_core::money::Money;
use farmgate_core::types::TaxRate;
use farmgate_core::validation::validate_tax_rate_bps;
use serde::{Deserialize, Serialize};

/// Development signing secret. Production deployments must set `JWT_SECRET`.
pub const DEV_JWT_SECRET: &str = "farmgate-dev-secret-change-in-production";

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub database_max_connections: u32,

    /// JWT secret key for signing tokens
    pub jwt_secret: String,

    /// Access token lifetime in seconds
    pub jwt_access_lifetime_secs: i64,

    /// Refresh token lifetime in seconds
    pub jwt_refresh_lifetime_secs: i64,

    /// Mark the refresh cookie `Secure`
    pub cookie_secure: bool,

    /// Orders with a subtotal above this ship free (whole Naira)
    pub free_shipping_threshold: i64,

    /// Flat shipping fee (whole Naira)
    pub flat_shipping_fee: i64,

    /// VAT in basis points (750 = 7.5%)
    pub vat_rate_bps: u32,

    /// Load the starting catalog into an empty database on startup
    pub seed_catalog: bool,

    /// Super admin created on startup if no account has this email
    pub bootstrap_admin_email: Option<String>,

    pub bootstrap_admin_password: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            http_port: 8080,
            database_path: "./data/farmgate.db".to_string(),
            database_max_connections: 5,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_access_lifetime_secs: 900,
            jwt_refresh_lifetime_secs: 604_800,
            cookie_secure: false,
            free_shipping_threshold: 50_000,
            flat_shipping_fee: 2_500,
            vat_rate_bps: 750,
            seed_catalog: true,
            bootstrap_admin_email: None,
            bootstrap_admin_password: None,
        }
    }
}

/// Parses `key` if set, otherwise returns `default`.
fn var_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        Err(_) => Ok(default),
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = ServerConfig::default();

        let config = ServerConfig {
            http_port: var_or("HTTP_PORT", defaults.http_port)?,
            database_path: optional_var("DATABASE_PATH").unwrap_or(defaults.database_path),
            database_max_connections: var_or(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            jwt_secret: optional_var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            jwt_access_lifetime_secs: var_or(
                "JWT_ACCESS_LIFETIME_SECS",
                defaults.jwt_access_lifetime_secs,
            )?,
            jwt_refresh_lifetime_secs: var_or(
                "JWT_REFRESH_LIFETIME_SECS",
                defaults.jwt_refresh_lifetime_secs,
            )?,
            cookie_secure: var_or("COOKIE_SECURE", defaults.cookie_secure)?,
            free_shipping_threshold: var_or(
                "FREE_SHIPPING_THRESHOLD",
                defaults.free_shipping_threshold,
            )?,
            flat_shipping_fee: var_or("FLAT_SHIPPING_FEE", defaults.flat_shipping_fee)?,
            vat_rate_bps: var_or("VAT_RATE_BPS", defaults.vat_rate_bps)?,
            seed_catalog: var_or("SEED_CATALOG", defaults.seed_catalog)?,
            bootstrap_admin_email: optional_var("BOOTSTRAP_ADMIN_EMAIL"),
            bootstrap_admin_password: optional_var("BOOTSTRAP_ADMIN_PASSWORD"),
        };

        config.validate()?;
        Ok(config)
    }

    /// Cross-field checks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_access_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("JWT_ACCESS_LIFETIME_SECS".to_string()));
        }
        if self.jwt_refresh_lifetime_secs <= self.jwt_access_lifetime_secs {
            return Err(ConfigError::InvalidValue("JWT_REFRESH_LIFETIME_SECS".to_string()));
        }
        if self.free_shipping_threshold < 0 {
            return Err(ConfigError::InvalidValue("FREE_SHIPPING_THRESHOLD".to_string()));
        }
        if self.flat_shipping_fee < 0 {
            return Err(ConfigError::InvalidValue("FLAT_SHIPPING_FEE".to_string()));
        }
        if validate_tax_rate_bps(self.vat_rate_bps).is_err() {
            return Err(ConfigError::InvalidValue("VAT_RATE_BPS".to_string()));
        }
        if self.bootstrap_admin_email.is_some() != self.bootstrap_admin_password.is_some() {
            return Err(ConfigError::MissingRequired(
                "BOOTSTRAP_ADMIN_EMAIL and BOOTSTRAP_ADMIN_PASSWORD must be set together"
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    /// Shipping and VAT settings for checkout.
    pub fn checkout_policy(&self) -> CheckoutPolicy {
        CheckoutPolicy {
            free_shipping_threshold: Money::from_naira(self.free_shipping_threshold),
            flat_shipping_fee: Money::from_naira(self.flat_shipping_fee),
            vat_rate: TaxRate::from_bps(self.vat_rate_bps),
        }
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
