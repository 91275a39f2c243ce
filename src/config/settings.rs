//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.
//! Every section is optional; missing values fall back to the defaults
//! shown below.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::header::HeaderValue;
use serde::Deserialize;

use crate::api::client::{
    DEFAULT_LANGUAGE, DEFAULT_MAX_RETRIES, DEFAULT_REFERER, DEFAULT_RETRY_DELAY, DEFAULT_TIMEOUT,
};
use crate::api::ClientConfig;
use crate::error::ConfigError;

/// Key used when no API key is configured. The upstream service grants it
/// a small, rate-limited slice of the catalogue.
pub const DEMO_API_KEY: &str = "demo_key_limited_access";

/// Default port for the SSE transport.
pub const DEFAULT_SSE_PORT: u16 = 3000;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Upstream API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Transport settings.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transport.sse_port == 0 {
            return Err(ConfigError::validation(
                "transport.sse_port must be between 1 and 65535",
            ));
        }

        if self.api.timeout_ms == 0 {
            return Err(ConfigError::validation("api.timeout_ms must be greater than 0"));
        }

        if self.api.language.trim().is_empty() {
            return Err(ConfigError::validation("api.language must not be empty"));
        }

        if HeaderValue::from_str(&self.api.language).is_err() {
            return Err(ConfigError::validation(
                "api.language is not a valid HTTP header value",
            ));
        }

        if HeaderValue::from_str(&self.api.referer).is_err() {
            return Err(ConfigError::validation(
                "api.referer is not a valid HTTP header value",
            ));
        }

        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::validation(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}

/// Upstream API configuration.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Bearer token for the Car2DB API.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Value of the `Accept-Language` header.
    #[serde(default = "default_language")]
    pub language: String,

    /// Referer sent until a client identifies itself.
    #[serde(default = "default_referer")]
    pub referer: String,

    /// Per-attempt timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay between retries in milliseconds; doubles on every retry.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl ApiConfig {
    /// Returns the configured key, ignoring blank values.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Returns `true` if no usable key is configured.
    #[must_use]
    pub fn uses_demo_key(&self) -> bool {
        self.api_key().is_none()
    }

    /// Builds the client configuration, falling back to [`DEMO_API_KEY`].
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.api_key().unwrap_or(DEMO_API_KEY))
            .with_language(self.language.clone())
            .with_referer(self.referer.clone())
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_max_retries(self.max_retries)
            .with_retry_delay(Duration::from_millis(self.retry_delay_ms))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            language: default_language(),
            referer: default_referer(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("language", &self.language)
            .field("referer", &self.referer)
            .field("timeout_ms", &self.timeout_ms)
            .field("max_retries", &self.max_retries)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .finish()
    }
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_referer() -> String {
    DEFAULT_REFERER.to_string()
}

#[allow(clippy::cast_possible_truncation)] // 30 s fits comfortably in u64 milliseconds
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT.as_millis() as u64
}

const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

#[allow(clippy::cast_possible_truncation)]
const fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY.as_millis() as u64
}

/// Which transport the server speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Newline-delimited JSON-RPC on stdin/stdout.
    #[default]
    Stdio,
    /// HTTP with server-sent events.
    Sse,
}

impl FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "sse" => Ok(Self::Sse),
            other => Err(format!("Unknown transport '{other}'. Must be one of: stdio, sse")),
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stdio => "stdio",
            Self::Sse => "sse",
        })
    }
}

/// Transport configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransportConfig {
    /// Transport mode.
    #[serde(default)]
    pub mode: TransportMode,

    /// Port for the SSE transport.
    #[serde(default = "default_sse_port")]
    pub sse_port: u16,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mode: TransportMode::default(),
            sse_port: default_sse_port(),
        }
    }
}

const fn default_sse_port() -> u16 {
    DEFAULT_SSE_PORT
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
