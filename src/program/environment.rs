//! Execution side information recorded on a program

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// External resources touched while executing a program
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessedEnvironment {
    /// Files read or written
    pub files: BTreeSet<String>,
    /// Network endpoints contacted
    pub network: BTreeSet<String>,
    /// System properties read
    pub properties: BTreeSet<String>,
    /// Whether the system clock was read
    pub clock: bool,
    /// Whether a random source was used
    pub randomness: bool,
}

impl AccessedEnvironment {
    /// Create an empty summary
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace this summary with a copy of `other`
    pub fn copy_from(&mut self, other: &Self) {
        self.clone_from(other);
    }

    /// Merge the accesses of `other` into this summary
    pub fn merge(&mut self, other: &Self) {
        self.files.extend(other.files.iter().cloned());
        self.network.extend(other.network.iter().cloned());
        self.properties.extend(other.properties.iter().cloned());
        self.clock |= other.clock;
        self.randomness |= other.randomness;
    }

    /// Forget every recorded access
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Whether nothing was accessed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
            && self.network.is_empty()
            && self.properties.is_empty()
            && !self.clock
            && !self.randomness
    }
}

/// Runtime contract broken by a program
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContractViolation {
    /// Contract name, e.g. `equals-reflexive`
    pub contract: String,
    /// Position of the statement that broke it
    pub position: usize,
    /// Free-form detail
    pub detail: String,
}

impl ContractViolation {
    /// Create a violation record
    #[must_use]
    pub fn new(contract: impl Into<String>, position: usize, detail: impl Into<String>) -> Self {
        Self {
            contract: contract.into(),
            position,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_lifecycle() {
        let mut env = AccessedEnvironment::new();
        assert!(env.is_empty());
        env.files.insert("/tmp/x".to_string());
        env.clock = true;

        let mut copy = AccessedEnvironment::new();
        copy.copy_from(&env);
        assert_eq!(copy, env);

        copy.clear();
        assert!(copy.is_empty());
        assert!(!env.is_empty());
    }

    #[test]
    fn test_environment_merge() {
        let mut a = AccessedEnvironment::new();
        a.network.insert("localhost:80".to_string());
        let mut b = AccessedEnvironment::new();
        b.randomness = true;
        a.merge(&b);
        assert!(a.randomness);
        assert_eq!(a.network.len(), 1);
    }
}
