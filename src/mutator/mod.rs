//! Structural mutation of programs
//!
//! One search step edits the working program in place. Each kind is tried
//! independently with probability 1/3; an empty program only grows.
//!
//! # Mutation Kinds
//!
//! | Kind | Code | Effect |
//! |------|------|--------|
//! | Delete | DEL | each statement with probability 1/len, together with its readers |
//! | Change | CHG | each statement with probability 1/len: perturb a literal or rebind one input |
//! | Insert | INS | insert at a random position, repeated while `u < 0.5^k` |
//!
//! Every kind leaves the program valid; this is debug-asserted after each
//! step.
//!
//! ```rust,ignore
//! use summit::mutator::{ProgramMutator, StructuralMutator};
//!
//! let mut mutator = StructuralMutator::new(cluster, Box::new(inserter), 40);
//! let changed = mutator.mutate(&mut program, &mut rng);
//! ```

mod operators;

pub use operators::MutationKind;

use std::collections::BTreeSet;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use crate::cluster::{Type, TypeCluster};
use crate::generator::literal::perturb;
use crate::generator::StatementInserter;
use crate::program::{ArrayOp, CandidateFilter, Program, StatementKind, VarRef};

/// Probability of applying each mutation kind in one step
const KIND_PROBABILITY: f64 = 1.0 / 3.0;

/// Decay of repeated insertions: the k-th insertion happens with `0.5^k`
const INSERT_DECAY: f64 = 0.5;

/// Edits a program in place
pub trait ProgramMutator: Send {
    /// Apply one mutation step; returns whether the program changed
    fn mutate(&mut self, program: &mut Program, rng: &mut dyn RngCore) -> bool;
}

/// One input of a statement that can be rebound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Callee,
    Arg(usize),
    Source,
    StoredValue,
}

/// Delete / change / insert mutator over a type cluster
pub struct StructuralMutator {
    cluster: Arc<dyn TypeCluster>,
    inserter: Box<dyn StatementInserter>,
    max_length: usize,
}

impl StructuralMutator {
    /// Create a mutator; insertion stops once `max_length` is reached
    #[must_use]
    pub fn new(
        cluster: Arc<dyn TypeCluster>,
        inserter: Box<dyn StatementInserter>,
        max_length: usize,
    ) -> Self {
        Self {
            cluster,
            inserter,
            max_length,
        }
    }

    /// Apply a single mutation kind
    pub fn apply(&mut self, kind: MutationKind, program: &mut Program, rng: &mut dyn RngCore) -> bool {
        let changed = match kind {
            MutationKind::Delete => self.delete(program, rng),
            MutationKind::Change => self.change(program, rng),
            MutationKind::Insert => self.insert(program, rng),
        };
        log::trace!("{kind} changed={changed} length={}", program.len());
        debug_assert!(program.is_valid(), "invalid after {kind}:\n{}", program.to_code());
        changed
    }

    fn delete(&self, program: &mut Program, rng: &mut dyn RngCore) -> bool {
        if program.is_empty() {
            return false;
        }
        #[allow(clippy::cast_precision_loss)]
        let probability = 1.0 / program.len() as f64;
        let mut changed = false;
        for position in (0..program.len()).rev() {
            if position < program.len() && rng.gen::<f64>() <= probability {
                changed |= delete_with_readers(program, position);
            }
        }
        changed
    }

    fn change(&self, program: &mut Program, rng: &mut dyn RngCore) -> bool {
        if program.is_empty() {
            return false;
        }
        #[allow(clippy::cast_precision_loss)]
        let probability = 1.0 / program.len() as f64;
        let mut changed = false;
        for position in 0..program.len() {
            if rng.gen::<f64>() <= probability {
                changed |= self.change_statement(program, position, rng);
            }
        }
        changed
    }

    fn change_statement(&self, program: &mut Program, position: usize, rng: &mut dyn RngCore) -> bool {
        let Ok(statement) = program.statement_mut(position) else {
            return false;
        };
        let ty = statement.ty().clone();
        if let StatementKind::Primitive(value) = statement.kind_mut() {
            let perturbed = perturb(value, &ty, rng);
            let changed = perturbed != *value;
            *value = perturbed;
            return changed;
        }
        self.rebind(program, position, rng)
    }

    /// Point one input of the statement at another compatible value
    fn rebind(&self, program: &mut Program, position: usize, rng: &mut dyn RngCore) -> bool {
        let slots = slots(program, position);
        let Some((slot, ty, current)) = slots.choose(rng).cloned() else {
            return false;
        };
        let filter = match slot {
            Slot::Callee | Slot::Source => CandidateFilter::non_null(),
            Slot::Arg(_) | Slot::StoredValue => CandidateFilter::any(),
        };
        let mut candidates =
            program.find_type_compatible(&ty, position, filter, self.cluster.as_ref());
        candidates.retain(|c| !c.same_value(&current));
        let Some(replacement) = candidates.choose(rng).cloned() else {
            return false;
        };
        let Ok(statement) = program.statement_mut(position) else {
            return false;
        };
        let target = match (statement.kind_mut(), slot) {
            (StatementKind::Call { callee: Some(c), .. }, Slot::Callee) => c,
            (StatementKind::Call { args, .. } | StatementKind::Construct { args, .. }, Slot::Arg(i)) => {
                match args.get_mut(i) {
                    Some(arg) => arg,
                    None => return false,
                }
            }
            (StatementKind::FieldAccess { source: Some(s), .. }, Slot::Source) => s,
            (StatementKind::Array(ArrayOp::Store { value, .. }), Slot::StoredValue) => value,
            _ => return false,
        };
        log::trace!("rebinding {current} to {replacement} at {position}");
        *target = replacement;
        true
    }

    fn insert(&mut self, program: &mut Program, rng: &mut dyn RngCore) -> bool {
        let mut changed = false;
        let mut count = 0;
        while program.len() < self.max_length && rng.gen::<f64>() <= INSERT_DECAY.powi(count) {
            count += 1;
            let after = if program.is_empty() {
                None
            } else {
                Some(rng.gen_range(0..program.len()))
            };
            changed |= self
                .inserter
                .insert_guided_statement(program, after, rng)
                .is_some();
        }
        changed
    }
}

impl ProgramMutator for StructuralMutator {
    fn mutate(&mut self, program: &mut Program, rng: &mut dyn RngCore) -> bool {
        if program.is_empty() {
            return self.apply(MutationKind::Insert, program, rng);
        }
        let mut changed = false;
        for kind in MutationKind::all() {
            if rng.gen_bool(KIND_PROBABILITY) {
                changed |= self.apply(kind, program, rng);
            }
        }
        changed
    }
}

impl std::fmt::Debug for StructuralMutator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuralMutator")
            .field("max_length", &self.max_length)
            .finish_non_exhaustive()
    }
}

/// Rebindable inputs of the statement at `position` with their required types
fn slots(program: &Program, position: usize) -> Vec<(Slot, Type, VarRef)> {
    let Ok(statement) = program.statement(position) else {
        return Vec::new();
    };
    match statement.kind() {
        StatementKind::Construct {
            constructor,
            args,
            mock: None,
        } => constructor
            .params
            .iter()
            .zip(args)
            .enumerate()
            .map(|(i, (ty, arg))| (Slot::Arg(i), ty.clone(), arg.clone()))
            .collect(),
        StatementKind::Call {
            method,
            callee,
            args,
        } => callee
            .iter()
            .map(|c| (Slot::Callee, method.declaring.clone(), c.clone()))
            .chain(
                method
                    .params
                    .iter()
                    .zip(args)
                    .enumerate()
                    .map(|(i, (ty, arg))| (Slot::Arg(i), ty.clone(), arg.clone())),
            )
            .collect(),
        StatementKind::FieldAccess {
            field,
            source: Some(source),
        } => vec![(Slot::Source, field.declaring.clone(), source.clone())],
        StatementKind::Array(ArrayOp::Store { target, value }) => program
            .var_type(target)
            .map(|ty| vec![(Slot::StoredValue, ty, value.clone())])
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Remove the statement at `position` and every statement that reads it
///
/// Assertions left pointing at removed values are dropped.
fn delete_with_readers(program: &mut Program, position: usize) -> bool {
    let Ok(statement) = program.statement(position) else {
        return false;
    };
    let mut removed = BTreeSet::from([position]);
    if !statement.is_store() {
        removed.extend(program.reference_positions(&statement.output(position)));
    }
    let keep: BTreeSet<usize> = (0..program.len()).filter(|p| !removed.contains(p)).collect();
    log::trace!("deleting {removed:?}");
    program.retain_positions(&keep);
    true
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::cluster::{ClassDecl, StaticCluster};
    use crate::generator::{ClusterInserter, RandomSelector};
    use crate::program::fixtures::*;
    use crate::program::{Assertion, Literal, Statement};

    fn foo_cluster() -> Arc<dyn TypeCluster> {
        Arc::new(
            StaticCluster::new().with_class(
                ClassDecl::new("Foo")
                    .with_constructor(vec![])
                    .with_method("bar", vec![], Type::int())
                    .with_method("take", vec![Type::int()], Type::Void),
            ),
        )
    }

    fn mutator(cluster: Arc<dyn TypeCluster>) -> StructuralMutator {
        let inserter = ClusterInserter::new(Arc::clone(&cluster), Box::new(RandomSelector::new()));
        StructuralMutator::new(cluster, Box::new(inserter), 40)
    }

    /// `[new Foo() -> v0, 7 -> v1, v0.take(v1), 3 -> v3]`
    fn foo_take() -> Program {
        let mut program = Program::new();
        let v0 = program.add_statement(new_foo()).expect("add should succeed");
        let v1 = program
            .add_statement(Statement::literal(Literal::Int(7), Type::int()))
            .expect("add should succeed");
        program
            .add_statement(Statement::call(take_int(), Some(v0), vec![v1]))
            .expect("add should succeed");
        program
            .add_statement(Statement::literal(Literal::Int(3), Type::int()))
            .expect("add should succeed");
        program
    }

    #[test]
    fn test_delete_removes_readers() {
        let mut program = foo_bar();
        assert!(delete_with_readers(&mut program, 0));
        assert!(program.is_empty());
    }

    #[test]
    fn test_delete_keeps_unrelated() {
        let mut program = foo_take();
        assert!(delete_with_readers(&mut program, 1));
        assert_eq!(program.len(), 2);
        assert!(program.is_valid());
        assert!(matches!(
            program.statements()[1].kind(),
            StatementKind::Primitive(Literal::Int(3))
        ));
    }

    #[test]
    fn test_delete_drops_stale_assertions() {
        let mut program = foo_take();
        program
            .statement_mut(3)
            .expect("position should exist")
            .add_assertion(Assertion::Primitive {
                source: VarRef::Value(1),
                value: Literal::Int(7),
            });
        delete_with_readers(&mut program, 1);
        assert!(!program.has_assertions());
    }

    #[test]
    fn test_change_perturbs_literal() {
        let cluster = foo_cluster();
        let mutator = mutator(cluster);
        let mut rng = StdRng::seed_from_u64(5);
        let mut program = foo_take();
        assert!(mutator.change_statement(&mut program, 1, &mut rng));
        assert!(!matches!(
            program.statements()[1].kind(),
            StatementKind::Primitive(Literal::Int(7))
        ));
    }

    #[test]
    fn test_change_rebinds_argument() {
        let cluster = foo_cluster();
        let mutator = mutator(cluster);
        let mut rng = StdRng::seed_from_u64(6);
        let mut program = foo_take();
        let call = Statement::call(take_int(), Some(VarRef::Value(0)), vec![VarRef::Value(1)]);
        program.add_statement(call).expect("add should succeed");

        let mut rebound = false;
        for _ in 0..20 {
            if mutator.rebind(&mut program, 4, &mut rng) {
                rebound = true;
                break;
            }
        }
        assert!(rebound);
        assert!(matches!(
            program.statements()[4].kind(),
            StatementKind::Call { args, .. } if args[0] == VarRef::Value(3)
        ));
        assert!(program.is_valid());
    }

    #[test]
    fn test_rebind_without_alternative() {
        let mutator = mutator(foo_cluster());
        let mut rng = StdRng::seed_from_u64(7);
        let mut program = foo_bar();
        assert!(!mutator.rebind(&mut program, 1, &mut rng));
        assert_eq!(program, foo_bar());
    }

    #[test]
    fn test_insert_respects_max_length() {
        let cluster = foo_cluster();
        let inserter = ClusterInserter::new(Arc::clone(&cluster), Box::new(RandomSelector::new()));
        let mut mutator = StructuralMutator::new(cluster, Box::new(inserter), 2);
        let mut rng = StdRng::seed_from_u64(8);
        let mut program = foo_bar();
        assert!(!mutator.apply(MutationKind::Insert, &mut program, &mut rng));
        assert_eq!(program.len(), 2);
    }

    #[test]
    fn test_empty_program_grows() {
        let mut mutator = mutator(foo_cluster());
        let mut rng = StdRng::seed_from_u64(9);
        let mut program = Program::new();
        assert!(mutator.mutate(&mut program, &mut rng));
        assert!(!program.is_empty());
    }

    mod proptests {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(100))]

            #[test]
            fn prop_mutation_preserves_validity(seed in any::<u64>(), steps in 1usize..20) {
                let mut mutator = mutator(foo_cluster());
                let mut rng = StdRng::seed_from_u64(seed);
                let mut program = foo_take();
                for _ in 0..steps {
                    mutator.mutate(&mut program, &mut rng);
                    prop_assert!(program.is_valid());
                    prop_assert!(program.len() <= 40);
                }
            }
        }
    }
}
