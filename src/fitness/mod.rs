//! Fitness evaluation
//!
//! The search treats fitness computation as a black box behind
//! [`FitnessOracle`]: given a program it returns one heuristic value per
//! goal in `[0, 1]`, where `0` means covered and `1` means no progress.

mod method_coverage;

pub use method_coverage::MethodCoverageOracle;

use std::collections::BTreeMap;

use crate::goals::{GoalId, GoalSet};
use crate::program::{AccessedEnvironment, ContractViolation, Program};
use crate::Result;

/// Heuristic value of a goal with no recorded progress
pub const NO_PROGRESS: f64 = 1.0;

/// Outcome of evaluating one program
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    /// Heuristic value per goal; absent goals count as no progress
    pub goal_fitness: BTreeMap<GoalId, f64>,
    /// Contract violations observed during execution
    pub violations: Vec<ContractViolation>,
    /// Resources the execution touched
    pub environment: AccessedEnvironment,
    /// Whether execution failed
    pub failing: bool,
}

impl Evaluation {
    /// Create an empty evaluation
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the heuristic value of one goal
    #[must_use]
    pub fn with_fitness(mut self, goal: GoalId, value: f64) -> Self {
        self.goal_fitness.insert(goal, value.clamp(0.0, NO_PROGRESS));
        self
    }

    /// Heuristic value of `goal`
    #[must_use]
    pub fn fitness(&self, goal: GoalId) -> f64 {
        self.goal_fitness.get(&goal).copied().unwrap_or(NO_PROGRESS)
    }

    /// Whether `goal` is covered
    #[must_use]
    pub fn is_covered(&self, goal: GoalId) -> bool {
        self.fitness(goal) <= 0.0
    }

    /// Covered goals
    pub fn covered(&self) -> impl Iterator<Item = GoalId> + '_ {
        self.goal_fitness
            .iter()
            .filter(|(_, value)| **value <= 0.0)
            .map(|(goal, _)| *goal)
    }
}

/// Black-box coverage oracle
pub trait FitnessOracle: Send {
    /// Goals this oracle measures
    fn goals(&self) -> &GoalSet;

    /// Execute (or analyse) `program` and measure every goal
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be evaluated
    fn evaluate(&mut self, program: &Program) -> Result<Evaluation>;
}
