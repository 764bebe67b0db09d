use std::{num::NonZeroU32, str::FromStr, time::Duration};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
}

const DEFAULT_VOTE_RATE: NonZeroU32 = NonZeroU32::new(10).unwrap();

/// Runtime settings, read from the environment (and `.env` via dotenvy).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub request_timeout: Duration,
    pub max_concurrent_requests: usize,
    /// Votes a single user may cast per second.
    pub vote_rate_per_second: NonZeroU32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 3000)?,
            jwt_secret,
            request_timeout: Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 10)?),
            max_concurrent_requests: parse_or(&lookup, "MAX_CONCURRENT_REQUESTS", 1024)?,
            vote_rate_per_second: parse_or(&lookup, "VOTE_RATE_PER_SECOND", DEFAULT_VOTE_RATE)?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
