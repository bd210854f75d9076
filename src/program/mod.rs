//! Candidate program representation
//!
//! A [`Program`] is an ordered, exclusively owned sequence of
//! [`Statement`]s. Statements refer to earlier values by position
//! ([`VarRef`]), so cloning, slicing and removal are local operations on
//! one vector.
//!
//! # Invariants
//!
//! - Every statement reads only values produced at a strictly smaller
//!   position. Mutating calls check this with `debug_assert!` after the
//!   fact; [`Program::remove_statement`] is the exception and leaves
//!   dangling readers for the caller to clean up.
//! - Clones are new individuals: a fresh identity, independent
//!   statements and bookkeeping.
//! - Equality and hashing follow the statement sequence only.
//!
//! # Example
//!
//! ```
//! use summit::cluster::{ConstructorRef, MethodRef, Type};
//! use summit::program::{Program, Statement};
//!
//! let foo = Type::class("Foo");
//! let mut program = Program::new();
//! let v0 = program
//!     .add_statement(Statement::construct(
//!         ConstructorRef { declaring: foo.clone(), params: vec![] },
//!         vec![],
//!     ))
//!     .unwrap();
//! let bar = MethodRef {
//!     declaring: foo,
//!     name: "bar".into(),
//!     params: vec![],
//!     returns: Type::int(),
//!     is_static: false,
//! };
//! let v1 = program.add_statement(Statement::call(bar, Some(v0.clone()), vec![])).unwrap();
//! assert_eq!(program.references(&v0), vec![v1]);
//! ```

mod analysis;
mod assertion;
mod downcast;
mod environment;
mod scope;
mod statement;
mod variable;

pub use assertion::Assertion;
pub use environment::{AccessedEnvironment, ContractViolation};
pub use scope::{CandidateFilter, MockPolicy};
pub use statement::{ArrayOp, Literal, MockKind, Statement, StatementKind};
pub use variable::VarRef;

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::cluster::Type;
use crate::goals::GoalId;
use crate::{Error, Result};

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

fn next_id() -> usize {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// One evolving test program
#[derive(Debug)]
pub struct Program {
    id: usize,
    statements: Vec<Statement>,
    covered_goals: BTreeSet<GoalId>,
    violations: BTreeSet<ContractViolation>,
    failing: bool,
    unstable: bool,
    environment: AccessedEnvironment,
}

impl Program {
    /// Create an empty program with a fresh identity
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: next_id(),
            statements: Vec::new(),
            covered_goals: BTreeSet::new(),
            violations: BTreeSet::new(),
            failing: false,
            unstable: false,
            environment: AccessedEnvironment::default(),
        }
    }

    /// Build a program from a statement sequence
    ///
    /// # Errors
    ///
    /// Returns `InvalidProgram` if any statement reads forward
    pub fn from_statements(statements: Vec<Statement>) -> Result<Self> {
        let mut program = Self::new();
        for statement in statements {
            program.add_statement(statement)?;
        }
        Ok(program)
    }

    /// Process-unique identity
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Number of statements
    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Whether the program has no statement
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// All statements in order
    #[must_use]
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Statement at `position`
    ///
    /// # Errors
    ///
    /// Returns `InvalidProgram` if the position is past the end
    pub fn statement(&self, position: usize) -> Result<&Statement> {
        self.statements.get(position).ok_or_else(|| self.out_of_range(position))
    }

    /// Mutable statement at `position`
    ///
    /// Callers must keep the statement's reads backward.
    ///
    /// # Errors
    ///
    /// Returns `InvalidProgram` if the position is past the end
    pub fn statement_mut(&mut self, position: usize) -> Result<&mut Statement> {
        if position >= self.statements.len() {
            return Err(self.out_of_range(position));
        }
        Ok(&mut self.statements[position])
    }

    fn out_of_range(&self, position: usize) -> Error {
        Error::InvalidProgram(format!(
            "position {position} out of range for program of length {}",
            self.statements.len()
        ))
    }

    /// Reference to the value produced at `position`
    ///
    /// # Errors
    ///
    /// Returns `InvalidProgram` if the position is past the end
    pub fn return_value(&self, position: usize) -> Result<VarRef> {
        Ok(self.statement(position)?.output(position))
    }

    /// Declared type of a reference, if it resolves
    #[must_use]
    pub fn var_type(&self, var: &VarRef) -> Option<Type> {
        match var {
            VarRef::Value(p) | VarRef::Null(p) => self.statements.get(*p).map(|s| s.ty().clone()),
            VarRef::Field { field, .. } => Some(field.ty.clone()),
            VarRef::ArrayElement { array, .. } => {
                self.var_type(array).and_then(|t| t.component().cloned())
            }
            VarRef::Dangling => None,
        }
    }

    /// Append a statement
    ///
    /// # Errors
    ///
    /// Returns `InvalidProgram` if the statement reads forward
    pub fn add_statement(&mut self, statement: Statement) -> Result<VarRef> {
        self.insert_statement(statement, self.statements.len())
    }

    /// Insert a statement at `position`, shifting later statements
    ///
    /// # Errors
    ///
    /// Returns `InvalidProgram` if the position is past the end or the
    /// statement reads a value produced at or after `position`
    pub fn insert_statement(&mut self, statement: Statement, position: usize) -> Result<VarRef> {
        if position > self.statements.len() {
            return Err(self.out_of_range(position));
        }
        if !statement.is_valid(position) {
            return Err(Error::InvalidProgram(format!(
                "statement '{}' cannot be placed at position {position}",
                statement.code(position)
            )));
        }
        for later in &mut self.statements[position..] {
            later.remap(&|p| Some(if p >= position { p + 1 } else { p }));
        }
        self.statements.insert(position, statement);
        debug_assert!(self.is_valid(), "invalid after insert:\n{}", self.to_code());
        Ok(self.statements[position].output(position))
    }

    /// Replace the statement at `position`
    ///
    /// # Errors
    ///
    /// Returns `InvalidProgram` if the position is past the end or the
    /// replacement reads forward
    pub fn set_statement(&mut self, statement: Statement, position: usize) -> Result<VarRef> {
        if position >= self.statements.len() {
            return Err(self.out_of_range(position));
        }
        if !statement.is_valid(position) {
            return Err(Error::InvalidProgram(format!(
                "statement '{}' cannot replace position {position}",
                statement.code(position)
            )));
        }
        self.statements[position] = statement;
        debug_assert!(self.is_valid(), "invalid after set:\n{}", self.to_code());
        Ok(self.statements[position].output(position))
    }

    /// Remove the statement at `position`
    ///
    /// Later readers of the removed value are left dangling; positions
    /// past the end are ignored.
    pub fn remove_statement(&mut self, position: usize) -> Option<Statement> {
        if position >= self.statements.len() {
            return None;
        }
        log::trace!("removing statement {position}");
        let removed = self.statements.remove(position);
        let shift = |p: usize| match p.cmp(&position) {
            std::cmp::Ordering::Less => Some(p),
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Greater => Some(p - 1),
        };
        for later in &mut self.statements[position..] {
            later.remap(&shift);
        }
        Some(removed)
    }

    /// Keep only the statements at the given positions, renumbering reads
    ///
    /// Assertions left reading a removed value are dropped.
    pub(crate) fn retain_positions(&mut self, keep: &BTreeSet<usize>) {
        let ranks: Vec<Option<usize>> = (0..self.statements.len())
            .scan(0, |next, p| {
                Some(keep.contains(&p).then(|| {
                    *next += 1;
                    *next - 1
                }))
            })
            .collect();
        let map = |p: usize| ranks.get(p).copied().flatten();
        let statements = std::mem::take(&mut self.statements);
        self.statements = statements
            .into_iter()
            .enumerate()
            .filter(|(p, _)| keep.contains(p))
            .map(|(_, mut statement)| {
                statement.remap(&map);
                statement
            })
            .collect();
        self.remove_stale_assertions();
    }

    fn remove_stale_assertions(&mut self) {
        let stale: Vec<Assertion> = self
            .assertions()
            .into_iter()
            .filter(|a| a.referenced_variables().iter().any(|r| r.is_dangling()))
            .cloned()
            .collect();
        for assertion in &stale {
            self.remove_assertion(assertion);
        }
    }

    /// Truncate the program to `length` statements
    pub fn chop(&mut self, length: usize) {
        self.statements.truncate(length);
    }

    /// Whether every statement reads only earlier, live values
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.statements
            .iter()
            .enumerate()
            .all(|(p, s)| s.is_valid(p))
    }

    /// Check validity, naming the first offending statement
    ///
    /// # Errors
    ///
    /// Returns `InvalidProgram` describing the first malformed statement
    pub fn validate(&self) -> Result<()> {
        match self
            .statements
            .iter()
            .enumerate()
            .find(|(p, s)| !s.is_valid(*p))
        {
            Some((p, s)) => Err(Error::InvalidProgram(format!(
                "statement {p} is malformed: {}",
                s.code(p)
            ))),
            None => Ok(()),
        }
    }

    /// Rewrite every read of `old` to `new`
    pub fn replace(&mut self, old: &VarRef, new: &VarRef) {
        for statement in &mut self.statements {
            statement.replace(old, new);
        }
    }

    /// Whether this program's statements are a prefix of `other`'s
    #[must_use]
    pub fn is_prefix(&self, other: &Program) -> bool {
        self.statements.len() <= other.statements.len()
            && self
                .statements
                .iter()
                .zip(&other.statements)
                .all(|(a, b)| a.kind() == b.kind() && a.ty() == b.ty())
    }

    /// Every non-primitive type the program touches
    ///
    /// Array types are reduced to their element type.
    #[must_use]
    pub fn accessed_types(&self) -> BTreeSet<Type> {
        let mut types = BTreeSet::new();
        let mut add = |ty: &Type| {
            let element = ty.element();
            if !element.is_primitive() && !element.is_void() {
                types.insert(element.clone());
            }
        };
        for (position, statement) in self.statements.iter().enumerate() {
            for var in statement.variable_references(position) {
                if let Some(ty) = self.var_type(&var) {
                    add(&ty);
                }
            }
            match statement.kind() {
                StatementKind::Call { method, .. } => {
                    add(&method.declaring);
                    add(&method.returns);
                    method.params.iter().for_each(&mut add);
                }
                StatementKind::Construct { constructor, .. } => {
                    add(&constructor.declaring);
                    constructor.params.iter().for_each(&mut add);
                }
                StatementKind::FieldAccess { field, .. } => {
                    add(&field.declaring);
                    add(&field.ty);
                }
                StatementKind::Array(_) | StatementKind::Primitive(_) => {}
            }
        }
        types
    }

    /// Textual rendering, one statement per line
    #[must_use]
    pub fn to_code(&self) -> String {
        self.statements
            .iter()
            .enumerate()
            .map(|(p, s)| s.code(p))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Every assertion in statement order
    #[must_use]
    pub fn assertions(&self) -> Vec<&Assertion> {
        self.statements.iter().flat_map(Statement::assertions).collect()
    }

    /// Whether any statement carries an assertion
    #[must_use]
    pub fn has_assertions(&self) -> bool {
        self.statements.iter().any(|s| !s.assertions().is_empty())
    }

    /// Statements plus assertions
    #[must_use]
    pub fn size_with_assertions(&self) -> usize {
        self.len() + self.assertions().len()
    }

    /// Copy the assertions of `other` onto the statements at the same
    /// positions, skipping duplicates and positions past the end
    pub fn add_assertions_from(&mut self, other: &Program) {
        for (statement, source) in self.statements.iter_mut().zip(&other.statements) {
            for assertion in source.assertions() {
                statement.add_assertion(assertion.clone());
            }
        }
    }

    /// Remove one assertion wherever it is attached
    pub fn remove_assertion(&mut self, assertion: &Assertion) {
        for statement in &mut self.statements {
            statement.remove_assertion(assertion);
        }
    }

    /// Remove every assertion
    pub fn remove_assertions(&mut self) {
        for statement in &mut self.statements {
            statement.clear_assertions();
        }
    }

    /// Record a goal as covered by this program
    pub fn add_covered_goal(&mut self, goal: GoalId) {
        self.covered_goals.insert(goal);
    }

    /// Forget one covered goal
    pub fn remove_covered_goal(&mut self, goal: GoalId) {
        self.covered_goals.remove(&goal);
    }

    /// Whether the goal is recorded as covered
    #[must_use]
    pub fn is_goal_covered(&self, goal: GoalId) -> bool {
        self.covered_goals.contains(&goal)
    }

    /// Covered goals
    #[must_use]
    pub fn covered_goals(&self) -> &BTreeSet<GoalId> {
        &self.covered_goals
    }

    /// Forget every covered goal; statements are untouched
    pub fn clear_covered_goals(&mut self) {
        self.covered_goals.clear();
    }

    /// Record a broken runtime contract
    pub fn add_contract_violation(&mut self, violation: ContractViolation) {
        self.violations.insert(violation);
    }

    /// Recorded contract violations
    #[must_use]
    pub fn contract_violations(&self) -> &BTreeSet<ContractViolation> {
        &self.violations
    }

    /// Whether execution is known to fail
    #[must_use]
    pub fn is_failing(&self) -> bool {
        self.failing
    }

    /// Set the failing flag
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    /// Whether execution was observed to be non-deterministic
    #[must_use]
    pub fn is_unstable(&self) -> bool {
        self.unstable
    }

    /// Set the unstable flag
    pub fn set_unstable(&mut self, unstable: bool) {
        self.unstable = unstable;
    }

    /// External resources touched by the last execution
    #[must_use]
    pub fn environment(&self) -> &AccessedEnvironment {
        &self.environment
    }

    /// Mutable environment summary
    pub fn environment_mut(&mut self) -> &mut AccessedEnvironment {
        &mut self.environment
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Program {
    fn clone(&self) -> Self {
        Self {
            id: next_id(),
            statements: self.statements.clone(),
            covered_goals: self.covered_goals.clone(),
            violations: self.violations.clone(),
            failing: self.failing,
            unstable: false,
            environment: self.environment.clone(),
        }
    }
}

impl PartialEq for Program {
    fn eq(&self, other: &Self) -> bool {
        self.statements == other.statements
    }
}

impl Eq for Program {}

impl Hash for Program {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.statements.hash(state);
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_code())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Small programs shared by the tests of this module tree

    use super::*;
    use crate::cluster::{ConstructorRef, MethodRef};

    pub fn foo() -> Type {
        Type::class("Foo")
    }

    pub fn new_foo() -> Statement {
        Statement::construct(
            ConstructorRef {
                declaring: foo(),
                params: vec![],
            },
            vec![],
        )
    }

    pub fn bar() -> MethodRef {
        MethodRef {
            declaring: foo(),
            name: "bar".to_string(),
            params: vec![],
            returns: Type::int(),
            is_static: false,
        }
    }

    pub fn take_int() -> MethodRef {
        MethodRef {
            declaring: foo(),
            name: "take".to_string(),
            params: vec![Type::int()],
            returns: Type::Void,
            is_static: false,
        }
    }

    /// `[new Foo() -> v0, v0.bar() -> v1]`
    pub fn foo_bar() -> Program {
        let mut program = Program::new();
        let v0 = program.add_statement(new_foo()).expect("add should succeed");
        program
            .add_statement(Statement::call(bar(), Some(v0), vec![]))
            .expect("add should succeed");
        program
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_scenario_remove_producer_invalidates() {
        let mut program = foo_bar();
        assert!(program.is_valid());
        let removed = program.remove_statement(0);
        assert!(removed.is_some());
        assert!(!program.is_valid());
        assert!(program.validate().is_err());
    }

    #[test]
    fn test_remove_past_end_is_noop() {
        let mut program = foo_bar();
        assert!(program.remove_statement(5).is_none());
        assert_eq!(program.len(), 2);
    }

    #[test]
    fn test_insert_rejects_forward_reference() {
        let mut program = foo_bar();
        let call = Statement::call(bar(), Some(VarRef::Value(1)), vec![]);
        let err = program
            .insert_statement(call, 1)
            .expect_err("forward reference should fail");
        assert!(matches!(err, Error::InvalidProgram(_)));
        assert_eq!(program.len(), 2);
    }

    #[test]
    fn test_insert_rejects_bad_position() {
        let mut program = foo_bar();
        assert!(program.insert_statement(new_foo(), 7).is_err());
        assert!(program.set_statement(new_foo(), 2).is_err());
        assert!(program.statement(2).is_err());
    }

    #[test]
    fn test_insert_shifts_later_reads() {
        let mut program = foo_bar();
        let v = program
            .insert_statement(Statement::literal(Literal::Int(3), Type::int()), 1)
            .expect("insert should succeed");
        assert_eq!(v, VarRef::Value(1));
        match program.statement(2).expect("statement").kind() {
            StatementKind::Call { callee, .. } => assert_eq!(callee, &Some(VarRef::Value(0))),
            other => panic!("unexpected kind {other:?}"),
        }
        program
            .insert_statement(new_foo(), 0)
            .expect("insert should succeed");
        match program.statement(3).expect("statement").kind() {
            StatementKind::Call { callee, .. } => assert_eq!(callee, &Some(VarRef::Value(1))),
            other => panic!("unexpected kind {other:?}"),
        }
        assert!(program.is_valid());
    }

    #[test]
    fn test_clone_independence() {
        let mut original = foo_bar();
        original.add_covered_goal(GoalId(3));
        original.set_failing(true);
        original.set_unstable(true);
        original.add_contract_violation(ContractViolation::new("equals", 1, "not reflexive"));
        original.environment_mut().clock = true;

        let mut copy = original.clone();
        assert_eq!(copy, original);
        assert_ne!(copy.id(), original.id());
        assert!(copy.is_goal_covered(GoalId(3)));
        assert!(copy.is_failing());
        assert!(!copy.is_unstable());
        assert_eq!(copy.contract_violations().len(), 1);
        assert!(copy.environment().clock);

        copy.add_statement(new_foo()).expect("add should succeed");
        copy.clear_covered_goals();
        assert_eq!(original.len(), 2);
        assert!(original.is_goal_covered(GoalId(3)));
        assert_ne!(copy, original);
    }

    #[test]
    fn test_equality_ignores_bookkeeping() {
        let a = foo_bar();
        let mut b = foo_bar();
        b.add_covered_goal(GoalId(1));
        assert_eq!(a, b);
        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_chop_and_prefix() {
        let full = foo_bar();
        let mut short = full.clone();
        short.chop(1);
        assert_eq!(short.len(), 1);
        assert!(short.is_prefix(&full));
        assert!(!full.is_prefix(&short));
    }

    #[test]
    fn test_var_type_resolution() {
        let mut program = Program::new();
        let array = program
            .add_statement(Statement::new_array(Type::int(), 2))
            .expect("add should succeed");
        assert_eq!(program.var_type(&array), Some(Type::array_of(Type::int())));
        assert_eq!(program.var_type(&array.element(1)), Some(Type::int()));
        assert_eq!(program.var_type(&VarRef::Dangling), None);
    }

    #[test]
    fn test_assertions_copy_by_position() {
        let mut with = foo_bar();
        let assertion = Assertion::Primitive {
            source: VarRef::Value(1),
            value: Literal::Int(7),
        };
        with.statement_mut(1)
            .expect("statement")
            .add_assertion(assertion.clone());
        let mut without = foo_bar();
        without.add_assertions_from(&with);
        without.add_assertions_from(&with);
        assert_eq!(without.assertions().len(), 1);
        assert_eq!(without.size_with_assertions(), 3);
        assert!(without.has_assertions());
        without.remove_assertion(&assertion);
        assert!(!without.has_assertions());
    }

    #[test]
    fn test_replace_rewrites_reads() {
        let mut program = foo_bar();
        program.insert_statement(new_foo(), 1).expect("insert should succeed");
        program.replace(&VarRef::Value(0), &VarRef::Value(1));
        match program.statement(2).expect("statement").kind() {
            StatementKind::Call { callee, .. } => assert_eq!(callee, &Some(VarRef::Value(1))),
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_accessed_types_reduce_arrays() {
        let mut program = foo_bar();
        program
            .add_statement(Statement::new_array(foo(), 1))
            .expect("add should succeed");
        let types = program.accessed_types();
        assert!(types.contains(&foo()));
        assert!(!types.iter().any(Type::is_array));
        assert!(!types.contains(&Type::int()));
    }

    #[test]
    fn test_to_code() {
        assert_eq!(foo_bar().to_code(), "Foo var0 = new Foo();\nint var1 = var0.bar();");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        /// Build a program from (position seed, read seed) pairs; each
        /// statement either stands alone or reads one earlier value.
        fn build(ops: &[(usize, Option<usize>)]) -> Program {
            let mut program = Program::new();
            for &(at, read) in ops {
                let position = at % (program.len() + 1);
                let statement = match read {
                    Some(r) if position > 0 => {
                        Statement::call(take_int(), Some(VarRef::Value(r % position)), vec![
                            VarRef::Value(r % position),
                        ])
                    }
                    _ => new_foo(),
                };
                program
                    .insert_statement(statement, position)
                    .expect("backward insert should succeed");
            }
            program
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(100))]

            #[test]
            fn prop_reads_stay_backward(
                ops in prop::collection::vec((0usize..20, prop::option::of(0usize..20)), 0..20)
            ) {
                let program = build(&ops);
                prop_assert!(program.is_valid());
                for (p, s) in program.statements().iter().enumerate() {
                    for read in s.reads() {
                        prop_assert!(read.position().is_some_and(|q| q < p));
                    }
                }
            }

            #[test]
            fn prop_clone_is_equal_and_independent(
                ops in prop::collection::vec((0usize..20, prop::option::of(0usize..20)), 1..20)
            ) {
                let original = build(&ops);
                let snapshot = original.to_code();
                let mut copy = original.clone();
                prop_assert_eq!(&copy, &original);
                copy.chop(0);
                prop_assert_eq!(original.to_code(), snapshot);
            }
        }
    }
}
