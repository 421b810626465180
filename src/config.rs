use std::net::SocketAddr;
use std::time::Duration;

use bigdecimal::BigDecimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Runtime settings, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub bind_addr: SocketAddr,
    pub price_api_key: String,
    pub price_api_url: String,
    pub price_lookup_timeout: Duration,
    pub session_secret: String,
    pub session_ttl_hours: i64,
    pub starting_cash: BigDecimal,
}

pub const MIN_SESSION_SECRET_LEN: usize = 32;
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let database_url = required("DATABASE_URL")?;
        let price_api_key = required("TWELVEDATA_API_KEY")?;

        let session_secret = required("SESSION_SECRET")?;
        if session_secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(ConfigError::Invalid {
                name: "SESSION_SECRET",
                reason: format!("must be at least {} bytes", MIN_SESSION_SECRET_LEN),
            });
        }

        let price_api_url = lookup("PRICE_API_URL")
            .unwrap_or_else(|| "https://api.twelvedata.com".to_string())
            .trim_end_matches('/')
            .to_string();

        let timeout_secs: u64 = parse_or("PRICE_LOOKUP_TIMEOUT_SECS", lookup("PRICE_LOOKUP_TIMEOUT_SECS"), 10)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "PRICE_LOOKUP_TIMEOUT_SECS",
                reason: "must be greater than zero".into(),
            });
        }

        let session_ttl_hours: i64 = parse_or("SESSION_TTL_HOURS", lookup("SESSION_TTL_HOURS"), 24)?;
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&session_ttl_hours) {
            return Err(ConfigError::Invalid {
                name: "SESSION_TTL_HOURS",
                reason: format!("must be between 1 and {}", MAX_SESSION_TTL_HOURS),
            });
        }
        let db_max_connections: u32 = parse_or("DB_MAX_CONNECTIONS", lookup("DB_MAX_CONNECTIONS"), 10)?;
        let bind_addr: SocketAddr = parse_or(
            "BIND_ADDR",
            lookup("BIND_ADDR"),
            SocketAddr::from(([0, 0, 0, 0], 3000)),
        )?;

        let starting_cash: BigDecimal = parse_or("STARTING_CASH", lookup("STARTING_CASH"), BigDecimal::from(10000))?;
        if starting_cash < BigDecimal::from(0) {
            return Err(ConfigError::Invalid {
                name: "STARTING_CASH",
                reason: "must not be negative".into(),
            });
        }

        Ok(Self {
            database_url,
            db_max_connections,
            bind_addr,
            price_api_key,
            price_api_url,
            price_lookup_timeout: Duration::from_secs(timeout_secs),
            session_secret,
            session_ttl_hours,
            starting_cash,
        })
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
    }
}
