//! Coverage goals
//!
//! Goals are enumerated upstream of the search and arrive here already
//! filtered; this module only names them and, for mutation criteria,
//! caps the number of mutants turned into goals.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of one coverage goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GoalId(pub usize);

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "goal#{}", self.0)
    }
}

/// Coverage criterion a goal belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Execute a source line
    Line,
    /// Take one side of a branch
    Branch,
    /// Invoke a method or constructor
    Method,
    /// Infect the state with a mutant
    WeakMutation,
    /// Propagate a mutant to an observable difference
    StrongMutation,
}

impl Criterion {
    /// All criteria
    #[must_use]
    pub fn all() -> Vec<Self> {
        vec![
            Self::Line,
            Self::Branch,
            Self::Method,
            Self::WeakMutation,
            Self::StrongMutation,
        ]
    }

    /// Short name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Branch => "branch",
            Self::Method => "method",
            Self::WeakMutation => "weak-mutation",
            Self::StrongMutation => "strong-mutation",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One coverage target
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Goal {
    /// Identity
    pub id: GoalId,
    /// Criterion
    pub criterion: Criterion,
    /// Human-readable target name
    pub name: String,
}

/// Goals keyed by identity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalSet {
    goals: BTreeMap<GoalId, Goal>,
}

impl GoalSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a goal with the next free identity
    pub fn push(&mut self, criterion: Criterion, name: impl Into<String>) -> GoalId {
        let id = GoalId(self.goals.keys().next_back().map_or(0, |g| g.0 + 1));
        self.goals.insert(
            id,
            Goal {
                id,
                criterion,
                name: name.into(),
            },
        );
        id
    }

    /// Goal by identity
    #[must_use]
    pub fn get(&self, id: GoalId) -> Option<&Goal> {
        self.goals.get(&id)
    }

    /// Goals in identity order
    pub fn iter(&self) -> impl Iterator<Item = &Goal> {
        self.goals.values()
    }

    /// Identities in order
    pub fn ids(&self) -> impl Iterator<Item = GoalId> + '_ {
        self.goals.keys().copied()
    }

    /// Goals of one criterion
    pub fn by_criterion(&self, criterion: Criterion) -> impl Iterator<Item = &Goal> {
        self.goals.values().filter(move |g| g.criterion == criterion)
    }

    /// Criteria that have at least one goal
    #[must_use]
    pub fn criteria(&self) -> Vec<Criterion> {
        let mut criteria: Vec<Criterion> = self.goals.values().map(|g| g.criterion).collect();
        criteria.sort();
        criteria.dedup();
        criteria
    }

    /// Number of goals
    #[must_use]
    pub fn len(&self) -> usize {
        self.goals.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }
}

/// A seeded fault of the unit under analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mutant {
    /// Operator that produced the mutant, e.g. `ReplaceConstant - 0 -> 1`
    pub operator: String,
    /// Mutated method
    pub method: String,
    /// Source line
    pub line: usize,
}

/// Operators dropped first when a class has too many mutants
pub const MUTANT_DROP_ORDER: [&str; 4] = [
    "ReplaceVariable",
    "InsertUnaryOperator",
    "ReplaceConstant",
    "ReplaceArithmeticOperator",
];

/// Drop whole operator families until fewer than `limit` mutants remain
///
/// Families are removed in [`MUTANT_DROP_ORDER`]; removal stops as soon
/// as the count falls below the limit. A pool at or below the limit is
/// returned unchanged.
#[must_use]
pub fn limit_mutants_per_class(mut mutants: Vec<Mutant>, limit: usize) -> Vec<Mutant> {
    if mutants.len() <= limit {
        return mutants;
    }
    for operator in MUTANT_DROP_ORDER {
        mutants.retain(|m| !m.operator.starts_with(operator));
        log::debug!("dropped {operator} mutants, {} remain", mutants.len());
        if mutants.len() < limit {
            break;
        }
    }
    mutants
}

/// Turn mutants into weak or strong mutation goals
pub fn mutation_goals(goals: &mut GoalSet, mutants: &[Mutant], strong: bool, limit: usize) -> Vec<GoalId> {
    let criterion = if strong {
        Criterion::StrongMutation
    } else {
        Criterion::WeakMutation
    };
    limit_mutants_per_class(mutants.to_vec(), limit)
        .into_iter()
        .map(|m| goals.push(criterion, format!("{}:{} {}", m.method, m.line, m.operator)))
        .collect()
}
