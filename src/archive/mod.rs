//! Best-so-far store per coverage goal
//!
//! The search loop only talks to the [`Archive`] trait. It updates the
//! archive after every evaluation, samples from it when resampling, and
//! shrinks its retention as the budget is consumed.

mod coverage;

pub use coverage::CoverageArchive;

use std::collections::BTreeSet;

use rand::RngCore;

use crate::chromosome::Chromosome;
use crate::fitness::Evaluation;
use crate::goals::GoalId;
use crate::program::Program;

/// Per-goal store of the best candidates found so far
pub trait Archive: Send {
    /// Offer an evaluated candidate; returns whether anything changed
    fn update(&mut self, chromosome: &Chromosome, evaluation: &Evaluation) -> bool;

    /// Draw a copy of a retained candidate, if any
    fn solution(&mut self, rng: &mut dyn RngCore) -> Option<Chromosome>;

    /// Distinct covering candidates; clears the updated flag
    fn solutions(&mut self) -> Vec<Program>;

    /// Whether the archive changed since the last call to [`Archive::solutions`]
    fn has_been_updated(&self) -> bool;

    /// Retain at most `n` candidates per uncovered goal from now on
    fn shrink_solutions(&mut self, n: usize);

    /// Whether nothing is retained
    fn is_empty(&self) -> bool;

    /// Goals covered by a retained candidate
    fn covered_goals(&self) -> BTreeSet<GoalId>;

    /// Best heuristic value seen for `goal`
    fn best_fitness(&self, goal: GoalId) -> f64;
}
