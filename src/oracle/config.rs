//! Oracle client configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Environment variable consulted when the configuration has no API key
pub const API_KEY_ENV: &str = "SUMMIT_LLM_API_KEY";

/// Settings of an OpenAI-compatible chat completion endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Completion token limit
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Chat completion endpoint
    pub api_url: String,
    /// Bearer token; falls back to [`API_KEY_ENV`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Request write timeout in seconds
    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,
    /// Response read timeout in seconds
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
}

fn default_temperature() -> f64 {
    0.2
}

fn default_max_tokens() -> u32 {
    256
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_write_timeout() -> u64 {
    30
}

fn default_read_timeout() -> u64 {
    60
}

impl LlmConfig {
    /// Create a configuration with default sampling and timeouts
    #[must_use]
    pub fn new(model: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            api_url: api_url.into(),
            api_key: None,
            connect_timeout_secs: default_connect_timeout(),
            write_timeout_secs: default_write_timeout(),
            read_timeout_secs: default_read_timeout(),
        }
    }

    /// Set the API key
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Load from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns `Configuration` naming the first invalid field
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(Error::Configuration("model must not be empty".to_string()));
        }
        if self.api_url.trim().is_empty() {
            return Err(Error::Configuration("api_url must not be empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::Configuration(format!(
                "temperature {} outside [0, 2]",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(Error::Configuration("max_tokens must be positive".to_string()));
        }
        Ok(())
    }

    /// API key from the configuration or the environment
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if neither provides one
    pub fn resolved_api_key(&self) -> Result<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                Error::Configuration(format!("no api_key configured and {API_KEY_ENV} is unset"))
            })
    }

    /// Connect timeout
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Write timeout
    #[must_use]
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    /// Read timeout
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}
