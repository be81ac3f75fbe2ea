// Client configuration for the flight-data provider
use std::env;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_BASE_URL: &str = "https://sky-scrapper.p.rapidapi.com/api";
pub const DEFAULT_API_HOST: &str = "sky-scrapper.p.rapidapi.com";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_host: String,
    pub locale: String,
    pub currency: String,
    pub market: String,
    pub country_code: String,
    // None leaves requests unbounded, same as the browser form
    pub timeout_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            api_host: DEFAULT_API_HOST.to_string(),
            locale: "en-US".to_string(),
            currency: "USD".to_string(),
            market: "en-US".to_string(),
            country_code: "US".to_string(),
            timeout_ms: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    // Builds a configuration from `FLIGHT_API_*` environment variables.
    // Unset variables fall back to `ClientConfig::default`. The API key has
    // no usable default and must be present.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    // Split out so tests can feed a map instead of mutating the process env
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_key = lookup("FLIGHT_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ClientError::ConfigError("FLIGHT_API_KEY is not set".to_string()))?;

        let timeout_ms = match lookup("FLIGHT_API_TIMEOUT_MS") {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|e| {
                warn!("Invalid FLIGHT_API_TIMEOUT_MS value: {e}");
                ClientError::ConfigError(format!("FLIGHT_API_TIMEOUT_MS: {e}"))
            })?),
            None => None,
        };

        Ok(Self {
            base_url: or_default(&lookup, "FLIGHT_API_BASE_URL", defaults.base_url),
            api_key,
            api_host: or_default(&lookup, "FLIGHT_API_HOST", defaults.api_host),
            locale: or_default(&lookup, "FLIGHT_API_LOCALE", defaults.locale),
            currency: or_default(&lookup, "FLIGHT_API_CURRENCY", defaults.currency),
            market: or_default(&lookup, "FLIGHT_API_MARKET", defaults.market),
            country_code: or_default(&lookup, "FLIGHT_API_COUNTRY", defaults.country_code),
            timeout_ms,
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        if self.base_url.trim().is_empty() {
            return Err(ClientError::ConfigError("base_url is empty".to_string()));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ClientError::ConfigError(format!(
                "base_url must be an http(s) URL, got {}",
                self.base_url
            )));
        }
        Ok(())
    }
}

fn or_default<F>(lookup: &F, key: &str, default: String) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default
    })
}
