//! Program generation
//!
//! Programs grow one statement at a time. A [`StatementInserter`] adds a
//! call, constructor or field read together with whatever helper
//! statements its parameters need; a [`VariableSelector`] decides which
//! existing value fills a parameter; a [`ChromosomeFactory`] repeats
//! insertion until a sampled target length is reached.
//!
//! # Components
//!
//! | Component | Role |
//! |-----------|------|
//! | [`RandomSelector`] | uniform choice among compatible values |
//! | [`LlmVariableSelector`] | text-oracle choice with retry and random fallback |
//! | [`ClusterInserter`] | random member of the cluster, parameters satisfied recursively |
//! | [`GuidedFactory`] | bounded growth loop |

mod factory;
mod inserter;
pub mod literal;
mod selector;

pub use factory::GuidedFactory;
pub use inserter::ClusterInserter;
pub use selector::{parse_index, selection_prompt, LlmVariableSelector, RandomSelector};

use rand::RngCore;

use crate::chromosome::Chromosome;
use crate::cluster::{Type, TypeCluster};
use crate::program::{Program, VarRef};
use crate::Result;

/// Picks an existing value of a required type
pub trait VariableSelector: Send {
    /// Choose a value assignable to `ty` visible before `position`
    ///
    /// # Errors
    ///
    /// Returns `ConstructionFailed` if no compatible value exists
    fn select(
        &mut self,
        program: &Program,
        ty: &Type,
        position: usize,
        cluster: &dyn TypeCluster,
        rng: &mut dyn RngCore,
    ) -> Result<VarRef>;
}

/// Adds one statement to a program
pub trait StatementInserter: Send {
    /// Insert a statement after `after` (at the end when `None`)
    ///
    /// Returns the position of the inserted statement, or `None` when
    /// insertion was declined; a declined insertion leaves the program
    /// unchanged.
    fn insert_guided_statement(
        &mut self,
        program: &mut Program,
        after: Option<usize>,
        rng: &mut dyn RngCore,
    ) -> Option<usize>;
}

/// Source of fresh individuals
pub trait ChromosomeFactory: Send {
    /// Build a new individual; it may be empty
    fn chromosome(&mut self, rng: &mut dyn RngCore) -> Chromosome;
}
