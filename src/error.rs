//! Error types for Summit
//!
//! This module defines the error types used throughout the library.

use thiserror::Error;

use crate::oracle::OracleError;

/// Result type alias for Summit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during Summit operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed program construction (forward reference, bad position,
    /// dangling reference)
    #[error("invalid program: {0}")]
    InvalidProgram(String),

    /// A requested variable or type cannot be satisfied from the visible scope
    #[error("construction failed: {0}")]
    ConstructionFailed(String),

    /// Text-generation oracle failure
    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    /// Neither the generator nor the archive produced a usable candidate
    #[error("resampling produced no candidate at iteration {iteration}")]
    ResampleExhausted {
        /// Iteration at which resampling failed
        iteration: usize,
    },

    /// Fitness evaluation error
    #[error("fitness error: {0}")]
    Fitness(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl Error {
    /// Whether this is a recoverable construction failure
    #[must_use]
    pub fn is_construction_failure(&self) -> bool {
        matches!(self, Self::ConstructionFailed(_))
    }
}
