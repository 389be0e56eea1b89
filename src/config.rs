//! Configuration for the console client and the relay server.
//!
//! Both configs start from their `Default` values and can be overridden from
//! environment variables prefixed with `AGENT_CHAT_`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Prefix shared by every environment variable read here.
pub const ENV_PREFIX: &str = "AGENT_CHAT_";

/// Default backend base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8000;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// An environment variable could not be parsed.
    #[error("invalid value for {var}: {value:?}")]
    BadEnv {
        /// Full variable name.
        var: String,
        /// Raw value found.
        value: String,
    },
    /// URL parse error.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Convenience result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings for the chat client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the agent backend.
    pub api_url: String,
    /// Fixed client id; generated per session when absent.
    pub client_id: Option<String>,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// How long a notification stays visible, in seconds.
    pub notification_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            client_id: None,
            request_timeout_secs: 120,
            notification_secs: 6,
        }
    }
}

impl ClientConfig {
    /// Load defaults overridden by `AGENT_CHAT_API_URL`, `AGENT_CHAT_CLIENT_ID`,
    /// `AGENT_CHAT_TIMEOUT_SECS` and `AGENT_CHAT_NOTIFY_SECS`.
    ///
    /// # Errors
    /// Returns an error if a variable cannot be parsed or validation fails.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with a custom variable source.
    ///
    /// # Errors
    /// Returns an error if a variable cannot be parsed or validation fails.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let mut config = Self::default();
        if let Some(url) = env_value(&lookup, "API_URL") {
            config.api_url = url;
        }
        config.client_id = env_value(&lookup, "CLIENT_ID").or(config.client_id);
        if let Some(secs) = env_parsed(&lookup, "TIMEOUT_SECS")? {
            config.request_timeout_secs = secs;
        }
        if let Some(secs) = env_parsed(&lookup, "NOTIFY_SECS")? {
            config.notification_secs = secs;
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ConfigResult<()> {
        Url::parse(&self.api_url)?;
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Request timeout as a `Duration`.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Notification lifetime as a `Duration`.
    #[must_use]
    pub const fn notification_ttl(&self) -> Duration {
        Duration::from_secs(self.notification_secs)
    }
}

/// Settings for the relay server and its language model.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listening port.
    pub port: u16,
    /// Ollama base URL.
    pub ollama_url: String,
    /// Model name.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum tokens per reply.
    pub max_tokens: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            ollama_url: "http://127.0.0.1:11434".to_string(),
            model: "llama3.2".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
        }
    }
}

impl ServerConfig {
    /// Load defaults overridden by `AGENT_CHAT_PORT`, `AGENT_CHAT_OLLAMA_URL`,
    /// `AGENT_CHAT_MODEL`, `AGENT_CHAT_TEMPERATURE` and `AGENT_CHAT_MAX_TOKENS`.
    ///
    /// # Errors
    /// Returns an error if a variable cannot be parsed or validation fails.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with a custom variable source.
    ///
    /// # Errors
    /// Returns an error if a variable cannot be parsed or validation fails.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let mut config = Self::default();
        if let Some(port) = env_parsed(&lookup, "PORT")? {
            config.port = port;
        }
        if let Some(url) = env_value(&lookup, "OLLAMA_URL") {
            config.ollama_url = url;
        }
        if let Some(model) = env_value(&lookup, "MODEL") {
            config.model = model;
        }
        if let Some(temperature) = env_parsed(&lookup, "TEMPERATURE")? {
            config.temperature = temperature;
        }
        if let Some(max_tokens) = env_parsed(&lookup, "MAX_TOKENS")? {
            config.max_tokens = max_tokens;
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ConfigResult<()> {
        Url::parse(&self.ollama_url)?;
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model must not be empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid(
                "temperature must be within 0.0..=2.0".to_string(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::Invalid("max_tokens must be > 0".to_string()));
        }
        Ok(())
    }
}

fn env_value(lookup: &impl Fn(&str) -> Option<String>, suffix: &str) -> Option<String> {
    lookup(&format!("{ENV_PREFIX}{suffix}"))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    suffix: &str,
) -> ConfigResult<Option<T>> {
    env_value(lookup, suffix)
        .map(|raw| {
            raw.parse().map_err(|_| ConfigError::BadEnv {
                var: format!("{ENV_PREFIX}{suffix}"),
                value: raw,
            })
        })
        .transpose()
}
