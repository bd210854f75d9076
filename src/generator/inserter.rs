//! Statement insertion driven by the type cluster

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use super::literal::random_literal;
use super::{StatementInserter, VariableSelector};
use crate::cluster::{Callable, ConstructorRef, Type, TypeCluster};
use crate::program::{Program, Statement, VarRef};
use crate::{Error, Result};

/// Default bound on nested helper construction
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Default probability of asking the selector before creating a value
pub const DEFAULT_REUSE_PROBABILITY: f64 = 0.9;

/// Largest array allocated for an array parameter
const MAX_ARRAY_LENGTH: usize = 3;

/// Inserts a random constructor, method call or field read
///
/// Each parameter is satisfied, in order of preference, by a value from
/// the [`VariableSelector`], a random literal, a freshly constructed
/// helper (bounded by `max_depth`) or a typed `null`. Receivers are never
/// `null`. When any parameter cannot be satisfied every helper inserted
/// for the attempt is removed again.
pub struct ClusterInserter {
    cluster: Arc<dyn TypeCluster>,
    selector: Box<dyn VariableSelector>,
    max_depth: usize,
    reuse_probability: f64,
}

impl ClusterInserter {
    /// Create an inserter over `cluster`
    #[must_use]
    pub fn new(cluster: Arc<dyn TypeCluster>, selector: Box<dyn VariableSelector>) -> Self {
        Self {
            cluster,
            selector,
            max_depth: DEFAULT_MAX_DEPTH,
            reuse_probability: DEFAULT_REUSE_PROBABILITY,
        }
    }

    /// Set the helper construction depth bound
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the probability of consulting the selector first
    #[must_use]
    pub fn with_reuse_probability(mut self, probability: f64) -> Self {
        self.reuse_probability = probability.clamp(0.0, 1.0);
        self
    }

    /// Cluster the inserter draws members from
    #[must_use]
    pub fn cluster(&self) -> &Arc<dyn TypeCluster> {
        &self.cluster
    }

    fn insert_at(program: &mut Program, statement: Statement, cursor: &mut usize) -> Result<VarRef> {
        let var = program.insert_statement(statement, *cursor)?;
        *cursor += 1;
        Ok(var)
    }

    /// Remove the helpers inserted between `mark` and `cursor`
    fn rollback(program: &mut Program, mark: usize, cursor: &mut usize) {
        for _ in mark..*cursor {
            program.remove_statement(mark);
        }
        *cursor = mark;
    }

    /// Insert `callable` at `cursor` after the helpers its parameters need
    fn add_callable(
        &mut self,
        program: &mut Program,
        callable: &Callable,
        cursor: &mut usize,
        depth: usize,
        rng: &mut dyn RngCore,
    ) -> Result<VarRef> {
        let statement = match callable {
            Callable::Constructor(constructor) => {
                let args = self.satisfy_all(program, &constructor.params, cursor, depth, rng)?;
                Statement::construct(constructor.clone(), args)
            }
            Callable::Method(method) => {
                let callee = if method.is_static {
                    None
                } else {
                    Some(self.satisfy(program, &method.declaring, cursor, depth, false, rng)?)
                };
                let args = self.satisfy_all(program, &method.params, cursor, depth, rng)?;
                Statement::call(method.clone(), callee, args)
            }
            Callable::Field(field) => {
                let source = if field.is_static {
                    None
                } else {
                    Some(self.satisfy(program, &field.declaring, cursor, depth, false, rng)?)
                };
                Statement::field_access(field.clone(), source)
            }
        };
        Self::insert_at(program, statement, cursor)
    }

    fn satisfy_all(
        &mut self,
        program: &mut Program,
        params: &[Type],
        cursor: &mut usize,
        depth: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<VarRef>> {
        let mut args = Vec::with_capacity(params.len());
        for param in params {
            args.push(self.satisfy(program, param, cursor, depth, true, rng)?);
        }
        Ok(args)
    }

    fn satisfy(
        &mut self,
        program: &mut Program,
        ty: &Type,
        cursor: &mut usize,
        depth: usize,
        allow_null: bool,
        rng: &mut dyn RngCore,
    ) -> Result<VarRef> {
        if rng.gen_bool(self.reuse_probability) {
            match self
                .selector
                .select(program, ty, *cursor, self.cluster.as_ref(), rng)
            {
                Ok(var) => return Ok(var),
                Err(err) if err.is_construction_failure() => {}
                Err(err) => return Err(err),
            }
        }
        if let Some(value) = random_literal(ty, rng) {
            return Self::insert_at(program, Statement::literal(value, ty.clone()), cursor);
        }
        if depth < self.max_depth {
            let mark = *cursor;
            match self.construct(program, ty, cursor, depth + 1, rng) {
                Ok(var) => return Ok(var),
                Err(err) if err.is_construction_failure() => Self::rollback(program, mark, cursor),
                Err(err) => return Err(err),
            }
        }
        if allow_null && !ty.is_primitive() {
            return Self::insert_at(program, Statement::null(ty.clone()), cursor);
        }
        Err(Error::ConstructionFailed(format!(
            "cannot satisfy {ty} at position {cursor}"
        )))
    }

    /// Build a fresh value of `ty`: an array with stored elements or a
    /// constructor call of some concrete subtype
    fn construct(
        &mut self,
        program: &mut Program,
        ty: &Type,
        cursor: &mut usize,
        depth: usize,
        rng: &mut dyn RngCore,
    ) -> Result<VarRef> {
        if let Some(component) = ty.component() {
            let length = rng.gen_range(0..=MAX_ARRAY_LENGTH);
            let array = Self::insert_at(program, Statement::new_array(component.clone(), length), cursor)?;
            for index in 0..length {
                // slots that cannot be filled stay uninitialised
                let mark = *cursor;
                match self.satisfy(program, component, cursor, depth, true, rng) {
                    Ok(value) => {
                        let store = Statement::store(&array, index, value, component.clone());
                        Self::insert_at(program, store, cursor)?;
                    }
                    Err(err) => {
                        log::trace!("leaving slot {index} of {ty} empty: {err}");
                        Self::rollback(program, mark, cursor);
                    }
                }
            }
            return Ok(array);
        }
        let constructors: Vec<ConstructorRef> = self
            .cluster
            .concrete_subtypes(ty)
            .iter()
            .flat_map(|subtype| self.cluster.constructors(subtype))
            .collect();
        let constructor = constructors
            .choose(rng)
            .cloned()
            .ok_or_else(|| Error::ConstructionFailed(format!("no constructor produces {ty}")))?;
        self.add_callable(program, &Callable::Constructor(constructor), cursor, depth, rng)
    }
}

impl StatementInserter for ClusterInserter {
    fn insert_guided_statement(
        &mut self,
        program: &mut Program,
        after: Option<usize>,
        rng: &mut dyn RngCore,
    ) -> Option<usize> {
        let callables = self.cluster.callables();
        let callable = callables.choose(rng)?.clone();
        let start = after.map_or(program.len(), |p| (p + 1).min(program.len()));
        let before = program.len();
        let mut cursor = start;
        match self.add_callable(program, &callable, &mut cursor, 0, rng) {
            Ok(_) => {
                debug_assert!(program.is_valid(), "invalid after insertion:\n{}", program.to_code());
                Some(cursor - 1)
            }
            Err(err) => {
                for _ in before..program.len() {
                    program.remove_statement(start);
                }
                log::debug!("declined to insert {}: {err}", callable.signature());
                None
            }
        }
    }
}

impl std::fmt::Debug for ClusterInserter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterInserter")
            .field("max_depth", &self.max_depth)
            .field("reuse_probability", &self.reuse_probability)
            .finish_non_exhaustive()
    }
}
