//! Bounded per-goal populations (MIO style)
//!
//! # Retention rules
//!
//! | Goal state | Kept | Replaced when |
//! |------------|------|---------------|
//! | covered | one candidate | a shorter candidate also covers it |
//! | uncovered | up to `capacity` candidates with `0 < h < 1` | a candidate ranks better by `(h, len)` |
//!
//! A heuristic value of exactly 1.0 carries no information and is never
//! retained.

use std::collections::{BTreeMap, BTreeSet};

use rand::seq::SliceRandom;
use rand::RngCore;

use super::Archive;
use crate::chromosome::Chromosome;
use crate::fitness::{Evaluation, NO_PROGRESS};
use crate::goals::GoalId;
use crate::program::Program;

/// Candidate retained for an uncovered goal
#[derive(Debug, Clone)]
struct Entry {
    heuristic: f64,
    chromosome: Chromosome,
}

impl Entry {
    fn ranks_before(&self, other: &Self) -> bool {
        (self.heuristic, self.chromosome.len()) < (other.heuristic, other.chromosome.len())
    }
}

#[derive(Debug, Clone, Default)]
struct Population {
    covering: Option<Chromosome>,
    entries: Vec<Entry>,
    selection_count: usize,
}

impl Population {
    fn offer_covering(&mut self, chromosome: &Chromosome) -> bool {
        let shorter = self
            .covering
            .as_ref()
            .map_or(true, |c| chromosome.len() < c.len());
        if shorter {
            self.covering = Some(chromosome.clone());
            self.entries.clear();
            self.selection_count = 0;
        }
        shorter
    }

    fn offer_partial(&mut self, chromosome: &Chromosome, heuristic: f64, capacity: usize) -> bool {
        if self.covering.is_some() || heuristic >= NO_PROGRESS {
            return false;
        }
        let entry = Entry {
            heuristic,
            chromosome: chromosome.clone(),
        };
        if let Some(i) = self
            .entries
            .iter()
            .position(|e| e.chromosome.program() == chromosome.program())
        {
            if !entry.ranks_before(&self.entries[i]) {
                return false;
            }
            self.entries.remove(i);
        }
        let improves = self.entries.len() < capacity
            || self.entries.last().is_some_and(|worst| entry.ranks_before(worst));
        if !improves {
            return false;
        }
        let at = self
            .entries
            .iter()
            .position(|e| entry.ranks_before(e))
            .unwrap_or(self.entries.len());
        self.entries.insert(at, entry);
        self.entries.truncate(capacity);
        self.selection_count = 0;
        true
    }

    fn best(&self) -> f64 {
        if self.covering.is_some() {
            0.0
        } else {
            self.entries.first().map_or(NO_PROGRESS, |e| e.heuristic)
        }
    }
}

/// Archive with one bounded population per goal
#[derive(Debug, Clone)]
pub struct CoverageArchive {
    populations: BTreeMap<GoalId, Population>,
    capacity: usize,
    updated: bool,
}

impl CoverageArchive {
    /// Create an archive for `goals` retaining `capacity` partial candidates each
    #[must_use]
    pub fn new(goals: impl IntoIterator<Item = GoalId>, capacity: usize) -> Self {
        Self {
            populations: goals
                .into_iter()
                .map(|g| (g, Population::default()))
                .collect(),
            capacity: capacity.max(1),
            updated: false,
        }
    }

    /// Current per-goal retention limit
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of tracked goals
    #[must_use]
    pub fn goal_count(&self) -> usize {
        self.populations.len()
    }

    /// Number of candidates retained for `goal`
    #[must_use]
    pub fn retained(&self, goal: GoalId) -> usize {
        self.populations.get(&goal).map_or(0, |p| {
            p.entries.len() + usize::from(p.covering.is_some())
        })
    }
}

impl Archive for CoverageArchive {
    fn update(&mut self, chromosome: &Chromosome, evaluation: &Evaluation) -> bool {
        if chromosome.is_empty() {
            return false;
        }
        let capacity = self.capacity;
        let mut changed = false;
        for (goal, population) in &mut self.populations {
            let heuristic = evaluation.fitness(*goal);
            let accepted = if heuristic <= 0.0 {
                population.offer_covering(chromosome)
            } else {
                population.offer_partial(chromosome, heuristic, capacity)
            };
            if accepted {
                log::debug!(
                    "archive accepted program {} for {goal} (h = {heuristic:.3})",
                    chromosome.program().id()
                );
            }
            changed |= accepted;
        }
        self.updated |= changed;
        changed
    }

    fn solution(&mut self, rng: &mut dyn RngCore) -> Option<Chromosome> {
        let least_sampled = self
            .populations
            .values_mut()
            .filter(|p| p.covering.is_none() && !p.entries.is_empty())
            .min_by_key(|p| p.selection_count);
        if let Some(population) = least_sampled {
            population.selection_count += 1;
            return population
                .entries
                .choose(rng)
                .map(|e| e.chromosome.fresh_copy());
        }
        let covering: Vec<&Chromosome> = self
            .populations
            .values()
            .filter_map(|p| p.covering.as_ref())
            .collect();
        covering.choose(rng).map(|c| c.fresh_copy())
    }

    fn solutions(&mut self) -> Vec<Program> {
        self.updated = false;
        let mut programs: Vec<Program> = Vec::new();
        for chromosome in self.populations.values().filter_map(|p| p.covering.as_ref()) {
            if !programs.contains(chromosome.program()) {
                programs.push(chromosome.program().clone());
            }
        }
        programs
    }

    fn has_been_updated(&self) -> bool {
        self.updated
    }

    fn shrink_solutions(&mut self, n: usize) {
        let n = n.max(1);
        self.capacity = n;
        for population in self.populations.values_mut() {
            population.entries.truncate(n);
        }
    }

    fn is_empty(&self) -> bool {
        self.populations
            .values()
            .all(|p| p.covering.is_none() && p.entries.is_empty())
    }

    fn covered_goals(&self) -> BTreeSet<GoalId> {
        self.populations
            .iter()
            .filter(|(_, p)| p.covering.is_some())
            .map(|(g, _)| *g)
            .collect()
    }

    fn best_fitness(&self, goal: GoalId) -> f64 {
        self.populations.get(&goal).map_or(NO_PROGRESS, Population::best)
    }
}
