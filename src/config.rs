//! Environment configuration.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::aggregates::Pricing;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid { name: &'static str, value: String, expected: &'static str },
}

/// Credentials of the admin account created on first start.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminSeed {
    pub mobile_number: String,
    pub password: String,
}

impl fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSeed").field("mobile_number", &self.mobile_number).field("password", &"<redacted>").finish()
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub nats_url: Option<String>,
    pub tax_rate_percent: Decimal,
    pub admin: AdminSeed,
}

impl Config {
    /// Reads the process environment, after loading `.env` if there is one.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let tax_rate_percent: Decimal = parse(&var, "TAX_RATE_PERCENT", Decimal::from(Pricing::DEFAULT_TAX_PERCENT), "a decimal")?;
        if tax_rate_percent.is_sign_negative() || tax_rate_percent > Decimal::ONE_HUNDRED {
            return Err(ConfigError::Invalid {
                name: "TAX_RATE_PERCENT",
                value: tax_rate_percent.to_string(),
                expected: "between 0 and 100",
            });
        }
        Ok(Self {
            port: parse(&var, "PORT", 3000, "a port number")?,
            database_url: var("DATABASE_URL"),
            database_max_connections: parse(&var, "DATABASE_MAX_CONNECTIONS", 10, "a positive integer")?,
            nats_url: var("NATS_URL"),
            tax_rate_percent,
            admin: AdminSeed {
                mobile_number: var("ADMIN_MOBILE_NUMBER").unwrap_or_else(|| "9999999999".into()),
                password: var("ADMIN_PASSWORD").unwrap_or_else(|| "Admin@123".into()),
            },
        })
    }

    pub fn pricing(&self) -> Pricing { Pricing::new(self.tax_rate_percent) }
}

fn parse<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match var(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { name, value: raw, expected }),
    }
}
