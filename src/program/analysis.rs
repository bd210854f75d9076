//! Dependency, reference and slicing analysis

use std::collections::BTreeSet;

use super::{Program, VarRef};
use crate::{Error, Result};

impl Program {
    /// Whether the statement at `position` reads `var` or its additional
    /// reference
    fn reads_or_depends(&self, position: usize, var: &VarRef) -> bool {
        let statement = &self.statements[position];
        statement.references(position, var)
            || var
                .additional()
                .is_some_and(|additional| statement.references(position, additional))
    }

    /// Positions of statements that depend on `var`, transitively, in order
    pub(crate) fn reference_positions(&self, var: &VarRef) -> Vec<usize> {
        let Some(start) = var.position() else {
            return Vec::new();
        };
        let mut found: Vec<(usize, VarRef)> = Vec::new();
        for position in start + 1..self.statements.len() {
            let hit = self.reads_or_depends(position, var)
                || found.iter().any(|(_, v)| self.reads_or_depends(position, v));
            if hit {
                found.push((position, self.statements[position].output(position)));
            }
        }
        found.into_iter().map(|(p, _)| p).collect()
    }

    /// Values produced later that read `var`, directly or transitively
    #[must_use]
    pub fn references(&self, var: &VarRef) -> Vec<VarRef> {
        self.reference_positions(var)
            .into_iter()
            .map(|p| self.statements[p].output(p))
            .collect()
    }

    /// Positions the statement producing `var` transitively reads from,
    /// that statement included, highest first
    pub(crate) fn dependency_positions(&self, var: &VarRef) -> Vec<usize> {
        let Some(start) = var.position().filter(|p| *p < self.statements.len()) else {
            return Vec::new();
        };
        let mut dependents = BTreeSet::from([start]);
        let mut found = Vec::new();
        for position in (0..=start).rev() {
            let produced = self.statements[position].output(position);
            let needed = dependents
                .iter()
                .any(|&d| self.statements[d].references(d, &produced));
            if needed {
                dependents.insert(position);
                found.push(position);
            }
        }
        found
    }

    /// Values the statement producing `var` transitively depends on
    ///
    /// Includes `var`'s own producer; each dependency appears once.
    #[must_use]
    pub fn dependencies(&self, var: &VarRef) -> Vec<VarRef> {
        self.dependency_positions(var)
            .into_iter()
            .map(|p| self.statements[p].output(p))
            .collect()
    }

    /// Whether anything later reads `var`, or an assertion on its own
    /// statement checks it
    #[must_use]
    pub fn has_references(&self, var: &VarRef) -> bool {
        let Some(position) = var.position().filter(|p| *p < self.statements.len()) else {
            return false;
        };
        let later = (position + 1..self.statements.len())
            .any(|p| self.statements[p].references(p, var));
        later
            || self.statements[position]
                .assertions()
                .iter()
                .any(|a| a.referenced_variables().iter().any(|r| r.same_value(var)))
    }

    /// Reduce the program to the statements needed for `var`
    ///
    /// Keeps `var`'s producer, every statement that depends on it, and
    /// the backward closure of everything those statements read. All
    /// other statements are removed. Returns `var`'s new position.
    ///
    /// # Errors
    ///
    /// Returns `InvalidProgram` if `var` does not resolve to a statement
    pub fn slice_for(&mut self, var: &VarRef) -> Result<usize> {
        let position = var
            .position()
            .filter(|p| *p < self.statements.len())
            .ok_or_else(|| Error::InvalidProgram(format!("cannot slice for {var}")))?;

        let mut keep: BTreeSet<usize> = BTreeSet::from([position]);
        keep.extend(self.reference_positions(var));
        let last = keep.iter().next_back().copied().unwrap_or(position);

        for candidate in (0..=last).rev() {
            let produced = self.statements[candidate].output(candidate);
            let needed = keep.iter().any(|&d| self.reads_or_depends(d, &produced));
            if needed {
                keep.insert(candidate);
            }
        }

        let new_position = keep.range(..position).count();
        log::debug!(
            "slicing for {var}: keeping {} of {} statements",
            keep.len(),
            self.statements.len()
        );
        self.retain_positions(&keep);
        debug_assert!(self.is_valid(), "invalid after slice:\n{}", self.to_code());
        Ok(new_position)
    }
}
