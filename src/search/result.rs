//! Search outcome and its serializable report

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::fitness::NO_PROGRESS;
use crate::goals::{Criterion, GoalId, GoalSet};
use crate::program::Program;
use crate::Result;

/// Aggregate score of one criterion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    /// Goals covered
    pub covered: usize,
    /// Goals of the criterion
    pub total: usize,
    /// `covered / total`, 0 for an empty criterion
    pub coverage: f64,
    /// Mean best heuristic value; 1.0 means no progress at all
    pub fitness: f64,
}

impl CriterionScore {
    /// Score with nothing covered and no progress
    #[must_use]
    pub fn worst(total: usize) -> Self {
        Self {
            covered: 0,
            total,
            coverage: 0.0,
            fitness: NO_PROGRESS,
        }
    }

    /// Score from the best heuristic value of each goal
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_fitness(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::worst(0);
        }
        let total = values.len();
        let covered = values.iter().filter(|v| **v <= 0.0).count();
        Self {
            covered,
            total,
            coverage: covered as f64 / total as f64,
            fitness: values.iter().sum::<f64>() / total as f64,
        }
    }
}

/// Final suite of a search run
#[derive(Debug, Clone)]
pub struct SuiteResult {
    /// Distinct covering programs
    pub programs: Vec<Program>,
    /// Score per criterion
    pub scores: BTreeMap<Criterion, CriterionScore>,
    /// Search iterations run
    pub iterations: usize,
    /// Fitness evaluations consumed, finalization excluded
    pub evaluations: usize,
    /// Wall-clock time of the search
    pub elapsed: Duration,
    /// Whether finalization finished before its deadline
    pub complete: bool,
}

impl SuiteResult {
    /// Result of a search whose archive retained nothing
    #[must_use]
    pub fn empty(goals: &GoalSet) -> Self {
        let scores = goals
            .criteria()
            .into_iter()
            .map(|c| (c, CriterionScore::worst(goals.by_criterion(c).count())))
            .collect();
        Self {
            programs: Vec::new(),
            scores,
            iterations: 0,
            evaluations: 0,
            elapsed: Duration::ZERO,
            complete: true,
        }
    }

    /// Result scoring `programs` by the best value of each goal
    #[must_use]
    pub fn scored(
        goals: &GoalSet,
        programs: Vec<Program>,
        best: &BTreeMap<GoalId, f64>,
    ) -> Self {
        let scores = goals
            .criteria()
            .into_iter()
            .map(|c| {
                let values: Vec<f64> = goals
                    .by_criterion(c)
                    .map(|g| best.get(&g.id).copied().unwrap_or(NO_PROGRESS))
                    .collect();
                (c, CriterionScore::from_fitness(&values))
            })
            .collect();
        Self {
            programs,
            scores,
            iterations: 0,
            evaluations: 0,
            elapsed: Duration::ZERO,
            complete: true,
        }
    }

    /// Goals covered over all criteria
    #[must_use]
    pub fn covered(&self) -> usize {
        self.scores.values().map(|s| s.covered).sum()
    }

    /// Goals over all criteria
    #[must_use]
    pub fn total(&self) -> usize {
        self.scores.values().map(|s| s.total).sum()
    }

    /// Overall covered fraction
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn coverage(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.covered() as f64 / total as f64,
        }
    }

    /// Serializable view with rendered programs
    #[must_use]
    pub fn report(&self) -> SuiteReport {
        SuiteReport {
            tests: self.programs.iter().map(Program::to_code).collect(),
            scores: self
                .scores
                .iter()
                .map(|(c, s)| (c.name().to_string(), *s))
                .collect(),
            coverage: self.coverage(),
            iterations: self.iterations,
            evaluations: self.evaluations,
            elapsed_ms: u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX),
            complete: self.complete,
        }
    }
}

/// JSON view of a [`SuiteResult`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteReport {
    /// Rendered programs
    pub tests: Vec<String>,
    /// Score per criterion name
    pub scores: BTreeMap<String, CriterionScore>,
    /// Overall covered fraction
    pub coverage: f64,
    /// Search iterations run
    pub iterations: usize,
    /// Fitness evaluations consumed
    pub evaluations: usize,
    /// Wall-clock time in milliseconds
    pub elapsed_ms: u64,
    /// Whether finalization finished before its deadline
    pub complete: bool,
}

impl SuiteReport {
    /// Pretty JSON rendering
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if encoding fails
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl std::fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} tests, coverage {:.1}%, {} iterations, {} evaluations, {} ms{}",
            self.tests.len(),
            self.coverage * 100.0,
            self.iterations,
            self.evaluations,
            self.elapsed_ms,
            if self.complete { "" } else { " (finalization cut short)" }
        )?;
        for (criterion, score) in &self.scores {
            writeln!(
                f,
                "  {criterion}: {}/{} covered, fitness {:.3}",
                score.covered, score.total, score.fitness
            )?;
        }
        for (i, test) in self.tests.iter().enumerate() {
            writeln!(f, "\n// test {i}")?;
            write!(f, "{test}")?;
        }
        Ok(())
    }
}
