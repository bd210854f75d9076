//! Hooks for watching a search run

use super::{SampleSource, SuiteResult};

/// State after one search iteration
#[derive(Debug, Clone, PartialEq)]
pub struct IterationStats {
    /// Iterations completed, this one included
    pub iteration: usize,
    /// Consumed budget fraction
    pub progress: f64,
    /// Current generator sampling probability
    pub probability: f64,
    /// Current per-goal retention
    pub retention: usize,
    /// Goals covered by the archive
    pub covered: usize,
    /// Goals searched for
    pub goals: usize,
    /// Length of the working candidate after mutation
    pub length: usize,
    /// Source of the working candidate when it was resampled this iteration
    pub resampled: Option<SampleSource>,
    /// Whether the mutation step changed the candidate
    pub mutated: bool,
}

/// Receives search events; every method defaults to doing nothing
pub trait SearchObserver {
    /// Called once before initialization
    fn search_started(&mut self, _goals: usize) {}

    /// Called after every iteration
    fn iteration(&mut self, _stats: &IterationStats) {}

    /// Called once with the final result
    fn search_finished(&mut self, _result: &SuiteResult) {}
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl SearchObserver for NullObserver {}

/// Observer that logs a summary every `every` iterations
#[derive(Debug, Clone, Copy)]
pub struct LogObserver {
    every: usize,
}

impl LogObserver {
    /// Log every `every` iterations
    #[must_use]
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
        }
    }
}

impl SearchObserver for LogObserver {
    fn search_started(&mut self, goals: usize) {
        log::info!("searching for {goals} goals");
    }

    fn iteration(&mut self, stats: &IterationStats) {
        if stats.iteration % self.every == 0 {
            log::info!(
                "iteration {}: {}/{} goals covered, progress {:.2}, pr {:.3}, n {}",
                stats.iteration,
                stats.covered,
                stats.goals,
                stats.progress,
                stats.probability,
                stats.retention
            );
        }
    }

    fn search_finished(&mut self, result: &SuiteResult) {
        log::info!(
            "search finished: {} tests, {}/{} goals covered",
            result.programs.len(),
            result.covered(),
            result.total()
        );
    }
}
