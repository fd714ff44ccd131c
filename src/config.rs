use std::env::var;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use thiserror::Error;

use crate::{
    application::handlers::batch_dispatcher::{
        BatchOptions, DEFAULT_BATCH_SIZE, DEFAULT_INTER_BATCH_DELAY,
    },
    infrastructure::provider::whatsapp::WhatsAppConfig,
};

const DEFAULT_WA_API_BASE_URL: &str = "https://graph.facebook.com/v19.0";
const DEFAULT_WA_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env param {0}")]
    Missing(&'static str),
    #[error("invalid value for env param {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

pub struct Config {
    pub port: u16,
    pub scheme: String,
    pub host: String,
    /// In-memory repositories are used when unset.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub verify_token: String,
    pub whatsapp: WhatsAppConfig,
    pub batch: BatchOptions,
}

impl Config {
    pub fn try_parse() -> Result<Config, ConfigError> {
        let _ = dotenv();
        Self::from_lookup(|name| var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let batch_size: usize = parse_or(&lookup, "DISPATCH_BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        if batch_size == 0 {
            return Err(ConfigError::Invalid {
                name: "DISPATCH_BATCH_SIZE",
                reason: "must be greater than zero".to_string(),
            });
        }
        let delay_ms: u64 = parse_or(
            &lookup,
            "DISPATCH_BATCH_DELAY_MS",
            DEFAULT_INTER_BATCH_DELAY.as_millis() as u64,
        )?;
        let timeout_secs: u64 = parse_or(
            &lookup,
            "WA_REQUEST_TIMEOUT_SECS",
            DEFAULT_WA_REQUEST_TIMEOUT_SECS,
        )?;

        Ok(Config {
            port: required("PORT")?
                .parse::<u16>()
                .map_err(|err| ConfigError::Invalid {
                    name: "PORT",
                    reason: err.to_string(),
                })?,
            scheme: required("SCHEME")?,
            host: required("HOST")?,
            database_url: lookup("DATABASE_URL").filter(|value| !value.trim().is_empty()),
            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_DATABASE_MAX_CONNECTIONS,
            )?,
            verify_token: required("VERIFY_TOKEN")?,
            whatsapp: WhatsAppConfig {
                base_url: lookup("WA_API_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_WA_API_BASE_URL.to_string()),
                phone_number_id: required("WA_PHONE_NUMBER_ID")?,
                access_token: required("WA_ACCESS_TOKEN")?,
                timeout: Duration::from_secs(timeout_secs),
            },
            batch: BatchOptions {
                batch_size,
                inter_batch_delay: Duration::from_millis(delay_ms),
            },
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|err| ConfigError::Invalid {
            name,
            reason: err.to_string(),
        }),
    }
}
