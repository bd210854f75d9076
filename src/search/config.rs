//! Search parameters

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Parameters of the archive-guided search
///
/// Every field has a default, so an empty JSON object is a valid
/// configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Initial probability of sampling from the generator rather than the archive
    pub p_random_test_or_from_archive: f64,
    /// Initial number of candidates retained per uncovered goal
    pub tests_per_target: usize,
    /// Budget fraction after which the search only exploits the archive
    pub exploitation_starts_at: f64,
    /// Mutations applied to one working candidate before resampling
    pub max_mutations_before_giving_up: usize,
    /// Evaluations of one working candidate before resampling
    pub max_evaluations_before_giving_up: usize,
    /// Upper bound on generated and mutated program length
    pub chromosome_length: usize,
    /// Insertion attempts per generated program
    pub max_attempts: usize,
    /// Wall-clock ceiling of the finalization pass, in milliseconds
    pub finalize_timeout_ms: u64,
    /// Random seed; drawn from entropy when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            p_random_test_or_from_archive: 0.5,
            tests_per_target: 10,
            exploitation_starts_at: 0.5,
            max_mutations_before_giving_up: 10,
            max_evaluations_before_giving_up: 10,
            chromosome_length: 40,
            max_attempts: 1000,
            finalize_timeout_ms: 5000,
            seed: None,
        }
    }
}

impl SearchConfig {
    /// Set the random seed
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the initial sampling probability and retention
    #[must_use]
    pub fn with_sampling(mut self, probability: f64, tests_per_target: usize) -> Self {
        self.p_random_test_or_from_archive = probability;
        self.tests_per_target = tests_per_target;
        self
    }

    /// Set the exploitation onset
    #[must_use]
    pub fn with_exploitation_starts_at(mut self, fraction: f64) -> Self {
        self.exploitation_starts_at = fraction;
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
        if !(0.0..=1.0).contains(&self.p_random_test_or_from_archive) {
            return Err(Error::Configuration(format!(
                "p_random_test_or_from_archive {} outside [0, 1]",
                self.p_random_test_or_from_archive
            )));
        }
        if self.tests_per_target == 0 {
            return Err(Error::Configuration(
                "tests_per_target must be positive".to_string(),
            ));
        }
        if !(self.exploitation_starts_at > 0.0 && self.exploitation_starts_at <= 1.0) {
            return Err(Error::Configuration(format!(
                "exploitation_starts_at {} outside (0, 1]",
                self.exploitation_starts_at
            )));
        }
        if self.chromosome_length == 0 {
            return Err(Error::Configuration(
                "chromosome_length must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Finalization ceiling
    #[must_use]
    pub fn finalize_timeout(&self) -> Duration {
        Duration::from_millis(self.finalize_timeout_ms)
    }
}
