//! Growing fresh programs to a sampled length

use rand::{Rng, RngCore};

use super::{ChromosomeFactory, StatementInserter};
use crate::chromosome::Chromosome;
use crate::program::Program;

/// Appends statements until a random target length or the attempt budget
///
/// The target is drawn uniformly from `[1, max_length)`. Insertions may be
/// declined, so the result can be shorter than the target, even empty.
pub struct GuidedFactory {
    inserter: Box<dyn StatementInserter>,
    max_length: usize,
    max_attempts: usize,
}

impl GuidedFactory {
    /// Create a factory around `inserter`
    #[must_use]
    pub fn new(inserter: Box<dyn StatementInserter>, max_length: usize, max_attempts: usize) -> Self {
        Self {
            inserter,
            max_length,
            max_attempts,
        }
    }

    /// Upper bound (exclusive) on the target length
    #[must_use]
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    fn target_length(&self, rng: &mut dyn RngCore) -> usize {
        if self.max_length <= 1 {
            1
        } else {
            rng.gen_range(1..self.max_length)
        }
    }
}

impl ChromosomeFactory for GuidedFactory {
    fn chromosome(&mut self, rng: &mut dyn RngCore) -> Chromosome {
        let target = self.target_length(rng);
        let mut program = Program::new();
        let mut attempts = 0;
        while program.len() < target && attempts < self.max_attempts {
            let after = program.len().checked_sub(1);
            self.inserter.insert_guided_statement(&mut program, after, rng);
            attempts += 1;
        }
        if program.len() < target {
            log::debug!(
                "sampled {} of {target} statements after {attempts} attempts",
                program.len()
            );
        }
        debug_assert!(program.is_valid(), "invalid sample:\n{}", program.to_code());
        Chromosome::new(program)
    }
}

impl std::fmt::Debug for GuidedFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuidedFactory")
            .field("max_length", &self.max_length)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}
