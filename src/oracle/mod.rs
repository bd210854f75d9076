//! Text-generation oracle
//!
//! An external service that answers a free-text prompt with free text.
//! The search uses it for guided variable selection; every failure is
//! recovered by the caller through [`RetryPolicy`] and a local fallback.
//!
//! # Failure modes
//!
//! | Variant | Cause |
//! |---------|-------|
//! | [`OracleError::Transport`] | connection, timeout or I/O failure |
//! | [`OracleError::Status`] | non-success HTTP status |
//! | [`OracleError::MalformedResponse`] | payload without `choices[0].message.content` |
//!
//! # Example
//!
//! ```rust,ignore
//! use summit::oracle::{HttpTextOracle, LlmConfig, TextOracle};
//!
//! let config = LlmConfig::from_json_file("llm.json")?;
//! let oracle = HttpTextOracle::new(config)?;
//! let reply = oracle.query("Pick a number")?;
//! ```

mod config;
mod http;
mod retry;

pub use config::{LlmConfig, API_KEY_ENV};
pub use http::{HttpTextOracle, SYSTEM_PROMPT};
pub use retry::{Backoff, Pause, RetryExhausted, RetryPolicy, ThreadPause};

#[cfg(test)]
pub(crate) use retry::testing;

use thiserror::Error;

use crate::Result;

/// Failure of one oracle round-trip
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// Network or I/O failure
    #[error("transport failure: {0}")]
    Transport(String),

    /// Service answered with a non-success status
    #[error("service returned status {code}: {body}")]
    Status {
        /// HTTP status code
        code: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// Response did not have the expected shape
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Synchronous prompt/response oracle
pub trait TextOracle: Send + Sync {
    /// Send one prompt and return the reply text
    ///
    /// # Errors
    ///
    /// Returns `Error::Oracle` if the round-trip fails
    fn query(&self, prompt: &str) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oracle_error_display() {
        let err = OracleError::Status {
            code: 429,
            body: "slow down".to_string(),
        };
        assert_eq!(err.to_string(), "service returned status 429: slow down");
        assert!(OracleError::Transport("reset".to_string())
            .to_string()
            .contains("reset"));
    }
}
