//! Structural mutation kinds

/// The three structural edits applied to a program during search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// Statement Deletion
    /// Remove a statement and every later statement that reads it
    Delete,

    /// Statement Change
    /// Perturb a literal or rebind an argument to another compatible value
    Change,

    /// Statement Insertion
    /// Add a call, constructor or field read at a random position
    Insert,
}

impl MutationKind {
    /// Get all mutation kinds, in the order they are attempted
    #[must_use]
    pub fn all() -> Vec<Self> {
        vec![Self::Delete, Self::Change, Self::Insert]
    }

    /// Get description of the kind
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Delete => "Statement Deletion",
            Self::Change => "Statement Change",
            Self::Insert => "Statement Insertion",
        }
    }
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Delete => write!(f, "DEL"),
            Self::Change => write!(f, "CHG"),
            Self::Insert => write!(f, "INS"),
        }
    }
}
