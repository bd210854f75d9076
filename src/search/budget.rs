//! Search budget: evaluation count and wall-clock limits

use std::time::{Duration, Instant};

/// Stopping condition of the search
///
/// Progress is the largest consumed fraction over the configured limits.
/// A budget without limits never finishes on its own.
#[derive(Debug, Clone)]
pub struct SearchBudget {
    max_evaluations: Option<usize>,
    max_time: Option<Duration>,
    started: Instant,
    evaluations: usize,
}

impl SearchBudget {
    /// Budget limited by fitness evaluations
    #[must_use]
    pub fn evaluations(max: usize) -> Self {
        Self {
            max_evaluations: Some(max),
            max_time: None,
            started: Instant::now(),
            evaluations: 0,
        }
    }

    /// Budget limited by wall-clock time
    #[must_use]
    pub fn time(max: Duration) -> Self {
        Self {
            max_evaluations: None,
            max_time: Some(max),
            started: Instant::now(),
            evaluations: 0,
        }
    }

    /// Also limit by evaluations
    #[must_use]
    pub fn with_max_evaluations(mut self, max: usize) -> Self {
        self.max_evaluations = Some(max);
        self
    }

    /// Also limit by time
    #[must_use]
    pub fn with_max_time(mut self, max: Duration) -> Self {
        self.max_time = Some(max);
        self
    }

    /// Restart the clock
    pub fn start(&mut self) {
        self.started = Instant::now();
    }

    /// Count one fitness evaluation
    pub fn record_evaluation(&mut self) {
        self.evaluations += 1;
    }

    /// Evaluations consumed
    #[must_use]
    pub fn consumed_evaluations(&self) -> usize {
        self.evaluations
    }

    /// Time since the clock started
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Consumed fraction in `[0, 1]`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f64 {
        let by_evaluations = self.max_evaluations.map_or(0.0, |max| {
            if max == 0 {
                1.0
            } else {
                self.evaluations as f64 / max as f64
            }
        });
        let by_time = self.max_time.map_or(0.0, |max| {
            if max.is_zero() {
                1.0
            } else {
                self.elapsed().as_secs_f64() / max.as_secs_f64()
            }
        });
        by_evaluations.max(by_time).clamp(0.0, 1.0)
    }

    /// Whether any limit has been reached
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.progress() >= 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_progress() {
        let mut budget = SearchBudget::evaluations(4);
        assert!(budget.progress().abs() < f64::EPSILON);
        budget.record_evaluation();
        assert!((budget.progress() - 0.25).abs() < f64::EPSILON);
        for _ in 0..3 {
            budget.record_evaluation();
        }
        assert!(budget.is_finished());
        budget.record_evaluation();
        assert!((budget.progress() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_limits_are_finished() {
        assert!(SearchBudget::evaluations(0).is_finished());
        assert!(SearchBudget::time(Duration::ZERO).is_finished());
    }

    #[test]
    fn test_combined_takes_maximum() {
        let mut budget = SearchBudget::time(Duration::from_secs(3600)).with_max_evaluations(2);
        budget.record_evaluation();
        assert!(budget.progress() >= 0.5);
        assert!(!budget.is_finished());
        budget.record_evaluation();
        assert!(budget.is_finished());
        assert_eq!(budget.consumed_evaluations(), 2);
    }

    #[test]
    fn test_time_budget_not_finished_immediately() {
        let budget = SearchBudget::time(Duration::from_secs(3600));
        assert!(!budget.is_finished());
        assert!(budget.progress() < 0.01);
    }
}
