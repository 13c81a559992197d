//! Static configuration of the telemetry client.
//!
//! The target host is trusted and pre-configured; nothing here is negotiated at
//! runtime. Values can be deserialized (every field has a default) or overlaid
//! from `TELEMETRY_*` environment variables.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::connection::RetryPolicy;
use crate::errors::{Result, TelemetryError};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5010;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
/// ~50 Hz, the platform "game" sensor rate.
pub const DEFAULT_SAMPLE_PERIOD_MS: u64 = 20;

const RETRY_INITIAL_DELAY_MS: u64 = 200;
const RETRY_MAX_DELAY_MS: u64 = 5000;

const ENV_HOST: &str = "TELEMETRY_HOST";
const ENV_PORT: &str = "TELEMETRY_PORT";
const ENV_CONNECT_TIMEOUT_MS: &str = "TELEMETRY_CONNECT_TIMEOUT_MS";
const ENV_WRITE_TIMEOUT_MS: &str = "TELEMETRY_WRITE_TIMEOUT_MS";
const ENV_QUEUE_CAPACITY: &str = "TELEMETRY_QUEUE_CAPACITY";
const ENV_CONNECT_RETRIES: &str = "TELEMETRY_CONNECT_RETRIES";
const ENV_SAMPLE_PERIOD_MS: &str = "TELEMETRY_SAMPLE_PERIOD_MS";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout_ms: u64,
    pub write_timeout_ms: u64,
    pub queue_capacity: usize,
    /// Extra connect attempts after the first one fails. 0 keeps the
    /// connect-once behaviour.
    pub connect_retries: u32,
    pub sample_period_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            connect_retries: 0,
            sample_period_ms: DEFAULT_SAMPLE_PERIOD_MS,
        }
    }
}

impl TelemetryConfig {
    /// Creates a configuration targeting `host:port` with default timeouts.
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            ..Default::default()
        }
    }

    /// Default configuration overlaid with `TELEMETRY_*` environment variables.
    /// Returns a Config error if a variable holds an invalid value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` but reads values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(host) = lookup(ENV_HOST) {
            config.host = host;
        }
        if let Some(port) = parse_var(&lookup, ENV_PORT)? {
            config.port = port;
        }
        if let Some(ms) = parse_var(&lookup, ENV_CONNECT_TIMEOUT_MS)? {
            config.connect_timeout_ms = ms;
        }
        if let Some(ms) = parse_var(&lookup, ENV_WRITE_TIMEOUT_MS)? {
            config.write_timeout_ms = ms;
        }
        if let Some(capacity) = parse_var(&lookup, ENV_QUEUE_CAPACITY)? {
            config.queue_capacity = capacity;
        }
        if let Some(retries) = parse_var(&lookup, ENV_CONNECT_RETRIES)? {
            config.connect_retries = retries;
        }
        if let Some(ms) = parse_var(&lookup, ENV_SAMPLE_PERIOD_MS)? {
            config.sample_period_ms = ms;
        }
        config.validate()?;
        Ok(config)
    }

    /// Parses a configuration from a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| TelemetryError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(TelemetryError::Config("host is empty".to_string()));
        }
        if self.port == 0 {
            return Err(TelemetryError::Config("port must be non-zero".to_string()));
        }
        if self.queue_capacity == 0 {
            return Err(TelemetryError::Config(
                "queue_capacity must be non-zero".to_string(),
            ));
        }
        if self.connect_timeout_ms == 0 || self.write_timeout_ms == 0 {
            return Err(TelemetryError::Config(
                "timeouts must be non-zero".to_string(),
            ));
        }
        if self.sample_period_ms == 0 {
            return Err(TelemetryError::Config(
                "sample_period_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(self.sample_period_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        if self.connect_retries == 0 {
            RetryPolicy::none()
        } else {
            RetryPolicy::exponential(
                self.connect_retries,
                Duration::from_millis(RETRY_INITIAL_DELAY_MS),
                Duration::from_millis(RETRY_MAX_DELAY_MS),
            )
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| TelemetryError::Config(format!("{}={}: {}", key, value, e))),
        None => Ok(None),
    }
}
