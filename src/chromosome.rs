//! Search individual
//!
//! A [`Chromosome`] wraps one [`Program`] with the counters the search loop
//! uses to decide when to give up on it and the last measured fitness.

use std::collections::BTreeMap;

use crate::fitness::{Evaluation, NO_PROGRESS};
use crate::goals::GoalId;
use crate::program::Program;

/// One individual of the search
#[derive(Debug, Clone, PartialEq)]
pub struct Chromosome {
    program: Program,
    mutations: usize,
    evaluations: usize,
    fitness: BTreeMap<GoalId, f64>,
}

impl Chromosome {
    /// Wrap a program with zeroed counters
    #[must_use]
    pub fn new(program: Program) -> Self {
        Self {
            program,
            mutations: 0,
            evaluations: 0,
            fitness: BTreeMap::new(),
        }
    }

    /// Wrapped program
    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Mutable access to the wrapped program
    pub fn program_mut(&mut self) -> &mut Program {
        &mut self.program
    }

    /// Unwrap the program
    #[must_use]
    pub fn into_program(self) -> Program {
        self.program
    }

    /// Mutations applied since sampling
    #[must_use]
    pub fn mutations(&self) -> usize {
        self.mutations
    }

    /// Evaluations since sampling
    #[must_use]
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    /// Count one mutation step
    pub fn record_mutation(&mut self) {
        self.mutations += 1;
    }

    /// Store an evaluation outcome and count it
    ///
    /// The program's covered goals, contract violations, environment
    /// summary and failing flag are replaced by the outcome.
    pub fn record_evaluation(&mut self, evaluation: &Evaluation) {
        self.evaluations += 1;
        self.fitness.clone_from(&evaluation.goal_fitness);

        let program = &mut self.program;
        program.clear_covered_goals();
        for goal in evaluation.covered() {
            program.add_covered_goal(goal);
        }
        for violation in &evaluation.violations {
            program.add_contract_violation(violation.clone());
        }
        program.environment_mut().copy_from(&evaluation.environment);
        program.set_failing(evaluation.failing);
    }

    /// Last measured heuristic value of `goal`
    #[must_use]
    pub fn fitness(&self, goal: GoalId) -> f64 {
        self.fitness.get(&goal).copied().unwrap_or(NO_PROGRESS)
    }

    /// Copy with a fresh program identity and zeroed counters
    #[must_use]
    pub fn fresh_copy(&self) -> Self {
        Self {
            program: self.program.clone(),
            mutations: 0,
            evaluations: 0,
            fitness: self.fitness.clone(),
        }
    }

    /// Number of statements
    #[must_use]
    pub fn len(&self) -> usize {
        self.program.len()
    }

    /// Whether the program has no statements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.program.is_empty()
    }
}

impl From<Program> for Chromosome {
    fn from(program: Program) -> Self {
        Self::new(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::fixtures::foo_bar;
    use crate::program::ContractViolation;

    #[test]
    fn test_counters() {
        let mut chromosome = Chromosome::new(foo_bar());
        chromosome.record_mutation();
        chromosome.record_mutation();
        chromosome.record_evaluation(&Evaluation::new());
        assert_eq!(chromosome.mutations(), 2);
        assert_eq!(chromosome.evaluations(), 1);
        assert_eq!(chromosome.len(), 2);
    }

    #[test]
    fn test_record_evaluation_updates_program() {
        let mut chromosome = Chromosome::new(foo_bar());
        chromosome.program_mut().add_covered_goal(GoalId(9));
        let mut evaluation = Evaluation::new()
            .with_fitness(GoalId(0), 0.0)
            .with_fitness(GoalId(1), 0.25);
        evaluation
            .violations
            .push(ContractViolation::new("equals-null", 1, "threw"));
        evaluation.failing = true;
        chromosome.record_evaluation(&evaluation);

        let program = chromosome.program();
        assert!(program.is_goal_covered(GoalId(0)));
        assert!(!program.is_goal_covered(GoalId(9)));
        assert_eq!(program.contract_violations().len(), 1);
        assert!(program.is_failing());
        assert!((chromosome.fitness(GoalId(1)) - 0.25).abs() < f64::EPSILON);
        assert!((chromosome.fitness(GoalId(5)) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fresh_copy_resets_counters() {
        let mut chromosome = Chromosome::new(foo_bar());
        chromosome.record_mutation();
        chromosome.record_evaluation(&Evaluation::new().with_fitness(GoalId(0), 0.5));
        let copy = chromosome.fresh_copy();
        assert_eq!(copy.mutations(), 0);
        assert_eq!(copy.evaluations(), 0);
        assert_ne!(copy.program().id(), chromosome.program().id());
        assert_eq!(copy.program(), chromosome.program());
        assert!((copy.fitness(GoalId(0)) - 0.5).abs() < f64::EPSILON);
    }
}
