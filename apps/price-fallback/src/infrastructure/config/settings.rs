//! Fallback Service Settings
//!
//! Configuration types for the price fallback service, loaded from
//! environment variables.

use std::time::Duration;

use crate::application::services::SupervisorConfig;
use crate::domain::Symbol;

/// Upstream endpoints for the two price sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSettings {
    /// WebSocket base URL; the stream name is appended per symbol.
    pub stream: String,
    /// REST price ticker URL.
    pub poll: String,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            stream: "wss://stream.binance.com:9443/ws".to_string(),
            poll: "https://api.binance.com/api/v3/ticker/price".to_string(),
        }
    }
}

/// Polling and supervision timings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingSettings {
    /// Period between poll fetches.
    pub poll_interval: Duration,
    /// Per-request timeout for poll fetches.
    pub http_timeout: Duration,
    /// Forced stream close after open (`None` = disabled).
    pub demo_close_after: Option<Duration>,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(3000),
            http_timeout: Duration::from_millis(5000),
            demo_close_after: Some(Duration::from_millis(1000)),
        }
    }
}

/// Complete fallback service configuration.
#[derive(Debug, Clone)]
pub struct FallbackConfig {
    /// Tracked symbol.
    pub symbol: Symbol,
    /// Upstream endpoints.
    pub endpoints: EndpointSettings,
    /// Polling and supervision timings.
    pub timing: TimingSettings,
    /// Consecutive malformed payloads before escalation (0 = disabled).
    pub malformed_escalation: u32,
    /// Health check HTTP port (0 = disabled).
    pub health_port: u16,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            symbol: Symbol::new("BTCUSDT"),
            endpoints: EndpointSettings::default(),
            timing: TimingSettings::default(),
            malformed_escalation: 5,
            health_port: 8083,
        }
    }
}

impl FallbackConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the symbol is empty or the poll interval is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the symbol is empty or the poll interval is zero.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let symbol = match lookup("FALLBACK_SYMBOL") {
            Some(raw) => {
                let symbol = Symbol::new(&raw);
                if symbol.is_empty() {
                    return Err(ConfigError::EmptyValue("FALLBACK_SYMBOL".to_string()));
                }
                symbol
            }
            None => defaults.symbol,
        };

        let endpoints = EndpointSettings {
            stream: parse_env_string(&lookup, "FALLBACK_STREAM_ENDPOINT", defaults.endpoints.stream)?,
            poll: parse_env_string(&lookup, "FALLBACK_POLL_ENDPOINT", defaults.endpoints.poll)?,
        };

        let poll_interval = parse_env_duration_millis(
            &lookup,
            "FALLBACK_POLL_INTERVAL_MS",
            defaults.timing.poll_interval,
        );
        if poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "FALLBACK_POLL_INTERVAL_MS".to_string(),
                reason: "poll interval must be positive".to_string(),
            });
        }

        let demo_close_after = parse_env_duration_millis(
            &lookup,
            "FALLBACK_DEMO_CLOSE_AFTER_MS",
            defaults.timing.demo_close_after.unwrap_or_default(),
        );

        let timing = TimingSettings {
            poll_interval,
            http_timeout: parse_env_duration_millis(
                &lookup,
                "FALLBACK_HTTP_TIMEOUT_MS",
                defaults.timing.http_timeout,
            ),
            demo_close_after: (!demo_close_after.is_zero()).then_some(demo_close_after),
        };

        Ok(Self {
            symbol,
            endpoints,
            timing,
            malformed_escalation: parse_env_u32(
                &lookup,
                "FALLBACK_MALFORMED_ESCALATION",
                defaults.malformed_escalation,
            ),
            health_port: parse_env_u16(&lookup, "FALLBACK_HEALTH_PORT", defaults.health_port),
        })
    }

    /// Supervisor settings derived from this configuration.
    #[must_use]
    pub const fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            demo_close_after: self.timing.demo_close_after,
            malformed_escalation_threshold: self.malformed_escalation,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable has an unusable value.
    #[error("environment variable {key} is invalid: {reason}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
}

fn parse_env_string<F>(lookup: &F, key: &str, default: String) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(v) if v.trim().is_empty() => Err(ConfigError::EmptyValue(key.to_string())),
        Some(v) => Ok(v.trim().to_string()),
        None => Ok(default),
    }
}

fn parse_env_u16<F>(lookup: &F, key: &str, default: u16) -> u16
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_env_u32<F>(lookup: &F, key: &str, default: u32) -> u32
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_millis<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
