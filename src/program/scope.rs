//! Visible-scope queries: which values can be reused at a position

use rand::seq::SliceRandom;
use rand::Rng;

use super::{ArrayOp, MockKind, Program, StatementKind, VarRef};
use crate::cluster::{Type, TypeCluster};
use crate::{Error, Result};

/// Maximum field-access depth exposed by scope queries
const MAX_FIELD_DEPTH: usize = 2;

/// Which mock placeholders a scope query may return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockPolicy {
    /// Return every mock
    #[default]
    Keep,
    /// Drop every mock
    ExcludeAll,
    /// Drop functional mocks, keep mocks of abstract classes
    ExcludeFunctional,
}

/// Exclusions applied to type-compatible candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CandidateFilter {
    /// Drop `null` references
    pub exclude_null: bool,
    /// Drop literals, primitives and boxed primitives
    pub exclude_primitives: bool,
    /// Mock handling
    pub mocks: MockPolicy,
    /// Drop array elements
    pub exclude_array_elements: bool,
}

impl CandidateFilter {
    /// No exclusion
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Drop `null` and every mock
    #[must_use]
    pub fn non_null() -> Self {
        Self {
            exclude_null: true,
            mocks: MockPolicy::ExcludeAll,
            ..Self::default()
        }
    }

    /// Drop `null`, primitive values and functional mocks
    #[must_use]
    pub fn non_null_non_primitive() -> Self {
        Self {
            exclude_null: true,
            exclude_primitives: true,
            mocks: MockPolicy::ExcludeFunctional,
            exclude_array_elements: false,
        }
    }

    /// Also drop array elements
    #[must_use]
    pub fn without_array_elements(mut self) -> Self {
        self.exclude_array_elements = true;
        self
    }

    fn admits(&self, program: &Program, var: &VarRef) -> bool {
        let statement = var.position().and_then(|p| program.statements.get(p));
        if self.exclude_null && var.is_null() {
            return false;
        }
        if self.exclude_array_elements && var.is_array_element() {
            return false;
        }
        if self.exclude_primitives {
            if statement.is_some_and(|s| s.is_literal()) {
                return false;
            }
            if program
                .var_type(var)
                .is_some_and(|t| t.is_primitive() || t.is_wrapper())
            {
                return false;
            }
        }
        let mock = statement.and_then(|s| s.mock_kind());
        match self.mocks {
            MockPolicy::Keep => true,
            MockPolicy::ExcludeAll => mock.is_none(),
            MockPolicy::ExcludeFunctional => mock != Some(MockKind::Functional),
        }
    }
}

impl Program {
    /// Whether `array[index]` is written by a store before `position`
    fn is_initialized(&self, array: &VarRef, index: usize, position: usize) -> bool {
        let slot = array.element(index);
        self.statements
            .iter()
            .take(position)
            .any(|s| match s.kind() {
                StatementKind::Array(ArrayOp::Store { target, .. }) => target.same_value(&slot),
                _ => false,
            })
    }

    /// Push the fields of `var` (of type `ty`) up to the depth limit,
    /// keeping only fields assignable to `target` when one is given
    fn push_fields(
        &self,
        out: &mut Vec<VarRef>,
        var: &VarRef,
        ty: &Type,
        target: Option<&Type>,
        cluster: &dyn TypeCluster,
    ) {
        if ty.is_primitive() || var.is_null() || var.depth() >= MAX_FIELD_DEPTH {
            return;
        }
        for field in cluster.accessible_fields(ty) {
            let field_ty = field.ty.clone();
            let reference = var.field(field);
            let wanted = target.map_or(true, |t| cluster.is_assignable(&field_ty, t));
            if wanted && !out.contains(&reference) {
                out.push(reference.clone());
            }
            self.push_fields(out, &reference, &field_ty, target, cluster);
        }
    }

    /// Values visible before `position` that are assignable to `ty`
    ///
    /// Arrays offer their initialised elements when their component type
    /// fits; objects that do not fit offer their accessible fields.
    #[must_use]
    pub fn find_type_compatible(
        &self,
        ty: &Type,
        position: usize,
        filter: CandidateFilter,
        cluster: &dyn TypeCluster,
    ) -> Vec<VarRef> {
        let mut out = Vec::new();
        for (i, statement) in self.statements.iter().enumerate().take(position) {
            if let StatementKind::Call { method, .. } = statement.kind() {
                if method.name == "hashCode" {
                    continue;
                }
            }
            let value_ty = statement.ty();
            if value_ty.is_void() || statement.is_store() {
                continue;
            }
            let value = statement.output(i);
            if value_ty.is_array() {
                if ty.is_array() && cluster.is_assignable(value_ty, ty) {
                    out.push(value);
                } else if let (Some(component), StatementKind::Array(ArrayOp::New { length })) =
                    (value_ty.component(), statement.kind())
                {
                    if cluster.is_assignable(component, ty) {
                        out.extend(
                            (0..*length)
                                .filter(|index| self.is_initialized(&value, *index, position))
                                .map(|index| value.element(index)),
                        );
                    }
                }
            } else if cluster.is_assignable(value_ty, ty) && value_ty.is_primitive() == ty.is_primitive()
            {
                out.push(value);
            } else {
                self.push_fields(&mut out, &value, value_ty, Some(ty), cluster);
            }
        }
        out.retain(|var| filter.admits(self, var));
        out
    }

    /// Every value visible before `position`, untyped
    ///
    /// Allocated arrays contribute all their elements; objects contribute
    /// their accessible fields.
    #[must_use]
    pub fn objects(&self, position: usize, cluster: &dyn TypeCluster) -> Vec<VarRef> {
        let mut out = Vec::new();
        for (i, statement) in self.statements.iter().enumerate().take(position) {
            if statement.ty().is_void() || statement.is_store() {
                continue;
            }
            let value = statement.output(i);
            match statement.kind() {
                StatementKind::Array(ArrayOp::New { length }) => {
                    out.extend((0..*length).map(|index| value.element(index)));
                }
                _ => {
                    out.push(value.clone());
                    self.push_fields(&mut out, &value, statement.ty(), None, cluster);
                }
            }
        }
        out
    }

    /// Last value at or after `from` assignable to `ty`
    ///
    /// # Errors
    ///
    /// Returns `ConstructionFailed` if no such value exists
    pub fn last_object(&self, ty: &Type, from: usize, cluster: &dyn TypeCluster) -> Result<VarRef> {
        (from..self.statements.len())
            .rev()
            .find(|&p| cluster.is_assignable(self.statements[p].ty(), ty))
            .map(|p| self.statements[p].output(p))
            .ok_or_else(|| Error::ConstructionFailed(format!("found no variables of type {ty}")))
    }

    /// Whether a value assignable to `ty` exists before `position`
    #[must_use]
    pub fn has_object(&self, ty: &Type, position: usize, cluster: &dyn TypeCluster) -> bool {
        self.statements
            .iter()
            .take(position)
            .any(|s| cluster.is_assignable(s.ty(), ty))
    }

    /// Whether some value could be cast down to `ty`
    #[must_use]
    pub fn has_castable_object(&self, ty: &Type, cluster: &dyn TypeCluster) -> bool {
        self.statements
            .iter()
            .any(|s| !s.ty().is_void() && cluster.is_assignable(ty, s.ty()))
    }

    fn choose_from<R: Rng + ?Sized>(
        candidates: &[VarRef],
        ty: &Type,
        position: usize,
        rng: &mut R,
    ) -> Result<VarRef> {
        candidates.choose(rng).cloned().ok_or_else(|| {
            Error::ConstructionFailed(format!(
                "found no variables of type {ty} at position {position}"
            ))
        })
    }

    /// Uniform choice among values of `ty` visible before `position`
    ///
    /// # Errors
    ///
    /// Returns `ConstructionFailed` if nothing is compatible
    pub fn random_object<R: Rng + ?Sized>(
        &self,
        ty: &Type,
        position: usize,
        cluster: &dyn TypeCluster,
        rng: &mut R,
    ) -> Result<VarRef> {
        let candidates = self.find_type_compatible(ty, position, CandidateFilter::any(), cluster);
        Self::choose_from(&candidates, ty, position, rng)
    }

    /// Uniform choice excluding `null` and mocks
    ///
    /// # Errors
    ///
    /// Returns `ConstructionFailed` if nothing is compatible
    pub fn random_non_null_object<R: Rng + ?Sized>(
        &self,
        ty: &Type,
        position: usize,
        cluster: &dyn TypeCluster,
        rng: &mut R,
    ) -> Result<VarRef> {
        let candidates =
            self.find_type_compatible(ty, position, CandidateFilter::non_null(), cluster);
        Self::choose_from(&candidates, ty, position, rng)
    }

    /// Uniform choice excluding `null`, primitives and functional mocks
    ///
    /// # Errors
    ///
    /// Returns `ConstructionFailed` if nothing is compatible
    pub fn random_non_null_non_primitive_object<R: Rng + ?Sized>(
        &self,
        ty: &Type,
        position: usize,
        cluster: &dyn TypeCluster,
        rng: &mut R,
    ) -> Result<VarRef> {
        let candidates = self.find_type_compatible(
            ty,
            position,
            CandidateFilter::non_null_non_primitive(),
            cluster,
        );
        Self::choose_from(&candidates, ty, position, rng)
    }

    /// Uniform choice among every value visible before `position`
    #[must_use]
    pub fn random_any_object<R: Rng + ?Sized>(
        &self,
        position: usize,
        cluster: &dyn TypeCluster,
        rng: &mut R,
    ) -> Option<VarRef> {
        self.objects(position, cluster).choose(rng).cloned()
    }
}
