//! Method coverage measured statically over a class model

use std::sync::Arc;

use super::{Evaluation, FitnessOracle, NO_PROGRESS};
use crate::cluster::{Callable, TypeCluster};
use crate::goals::{Criterion, GoalId, GoalSet};
use crate::program::{Program, StatementKind};
use crate::Result;

/// Heuristic value of an instance method whose receiver is available
const RECEIVER_AVAILABLE: f64 = 0.5;

/// One `Method` goal per public constructor and method of the cluster
///
/// A goal is covered when the program invokes the member (mock
/// placeholders do not count). An uncalled instance method scores 0.5
/// once a receiver of its declaring type exists, 1.0 otherwise.
pub struct MethodCoverageOracle {
    cluster: Arc<dyn TypeCluster>,
    goals: GoalSet,
    targets: Vec<(GoalId, Callable)>,
}

impl MethodCoverageOracle {
    /// Create goals for every constructor and method of `cluster`
    #[must_use]
    pub fn new(cluster: Arc<dyn TypeCluster>) -> Self {
        let mut goals = GoalSet::new();
        let targets = cluster
            .callables()
            .into_iter()
            .filter(|c| !matches!(c, Callable::Field(_)))
            .map(|callable| (goals.push(Criterion::Method, callable.signature()), callable))
            .collect();
        Self {
            cluster,
            goals,
            targets,
        }
    }

    fn invokes(program: &Program, target: &Callable) -> bool {
        program.statements().iter().any(|s| match (s.kind(), target) {
            (
                StatementKind::Construct {
                    constructor,
                    mock: None,
                    ..
                },
                Callable::Constructor(c),
            ) => constructor == c,
            (StatementKind::Call { method, .. }, Callable::Method(m)) => method == m,
            _ => false,
        })
    }

    fn heuristic(&self, program: &Program, target: &Callable) -> f64 {
        if Self::invokes(program, target) {
            return 0.0;
        }
        match target {
            Callable::Method(m)
                if !m.is_static
                    && program.has_object(&m.declaring, program.len(), self.cluster.as_ref()) =>
            {
                RECEIVER_AVAILABLE
            }
            _ => NO_PROGRESS,
        }
    }
}

impl FitnessOracle for MethodCoverageOracle {
    fn goals(&self) -> &GoalSet {
        &self.goals
    }

    fn evaluate(&mut self, program: &Program) -> Result<Evaluation> {
        Ok(self
            .targets
            .iter()
            .fold(Evaluation::new(), |evaluation, (goal, target)| {
                evaluation.with_fitness(*goal, self.heuristic(program, target))
            }))
    }
}

impl std::fmt::Debug for MethodCoverageOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodCoverageOracle")
            .field("goals", &self.goals.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ClassDecl, ConstructorRef, StaticCluster, Type};
    use crate::program::{MockKind, Statement};

    fn stack_cluster() -> Arc<dyn TypeCluster> {
        Arc::new(
            StaticCluster::new().with_class(
                ClassDecl::new("Stack")
                    .with_constructor(vec![])
                    .with_method("push", vec![Type::int()], Type::Void)
                    .with_method("pop", vec![], Type::int())
                    .with_field("size", Type::int()),
            ),
        )
    }

    fn new_stack() -> Statement {
        Statement::construct(
            ConstructorRef {
                declaring: Type::class("Stack"),
                params: vec![],
            },
            vec![],
        )
    }

    #[test]
    fn test_goals_skip_fields() {
        let oracle = MethodCoverageOracle::new(stack_cluster());
        assert_eq!(oracle.goals().len(), 3);
        assert!(oracle.goals().iter().all(|g| g.criterion == Criterion::Method));
    }

    #[test]
    fn test_empty_program_has_no_progress() {
        let mut oracle = MethodCoverageOracle::new(stack_cluster());
        let evaluation = oracle.evaluate(&Program::new()).expect("evaluate should succeed");
        assert_eq!(evaluation.covered().count(), 0);
        assert!(oracle
            .goals()
            .ids()
            .all(|g| (evaluation.fitness(g) - 1.0).abs() < f64::EPSILON));
    }

    #[test]
    fn test_constructed_receiver_is_half_way() {
        let cluster = stack_cluster();
        let mut oracle = MethodCoverageOracle::new(Arc::clone(&cluster));
        let mut program = Program::new();
        program.add_statement(new_stack()).expect("add");
        let evaluation = oracle.evaluate(&program).expect("evaluate should succeed");
        assert_eq!(evaluation.covered().count(), 1);
        let partial = evaluation
            .goal_fitness
            .values()
            .filter(|v| (**v - 0.5).abs() < f64::EPSILON)
            .count();
        assert_eq!(partial, 2);
    }

    #[test]
    fn test_calls_cover_methods() {
        let cluster = stack_cluster();
        let pop = cluster
            .find_method(&Type::class("Stack"), "pop", &[])
            .expect("pop exists");
        let mut oracle = MethodCoverageOracle::new(cluster);
        let mut program = Program::new();
        let stack = program.add_statement(new_stack()).expect("add");
        program
            .add_statement(Statement::call(pop, Some(stack), vec![]))
            .expect("add");
        let evaluation = oracle.evaluate(&program).expect("evaluate should succeed");
        assert_eq!(evaluation.covered().count(), 2);
    }

    #[test]
    fn test_mocks_do_not_cover_constructors() {
        let mut oracle = MethodCoverageOracle::new(stack_cluster());
        let mut program = Program::new();
        program
            .add_statement(Statement::mock(Type::class("Stack"), MockKind::Functional))
            .expect("add");
        let evaluation = oracle.evaluate(&program).expect("evaluate should succeed");
        assert_eq!(evaluation.covered().count(), 0);
    }
}
