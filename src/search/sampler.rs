//! Hybrid sampling of working candidates

use rand::{Rng, RngCore};

use crate::archive::Archive;
use crate::chromosome::Chromosome;
use crate::generator::ChromosomeFactory;
use crate::{Error, Result};

/// Where a resampled candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleSource {
    /// Freshly generated
    Generator,
    /// Copied from the archive
    Archive,
}

impl std::fmt::Display for SampleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generator => write!(f, "generator"),
            Self::Archive => write!(f, "archive"),
        }
    }
}

/// Picks a fresh working candidate from the generator or the archive
///
/// With probability `p` the generator is asked first and the archive is
/// the fallback for an empty result; otherwise the order is reversed.
pub struct HybridSampler {
    factory: Box<dyn ChromosomeFactory>,
}

impl HybridSampler {
    /// Create a sampler around the generation path
    #[must_use]
    pub fn new(factory: Box<dyn ChromosomeFactory>) -> Self {
        Self { factory }
    }

    fn generate(&mut self, rng: &mut dyn RngCore) -> Option<Chromosome> {
        Some(self.factory.chromosome(rng)).filter(|c| !c.is_empty())
    }

    /// Sample a non-empty candidate
    ///
    /// # Errors
    ///
    /// Returns `ResampleExhausted` if both sources come up empty
    pub fn sample(
        &mut self,
        archive: &mut dyn Archive,
        probability: f64,
        iteration: usize,
        rng: &mut dyn RngCore,
    ) -> Result<(Chromosome, SampleSource)> {
        let generator_first = rng.gen::<f64>() < probability;
        let sampled = if generator_first {
            self.generate(rng)
                .map(|c| (c, SampleSource::Generator))
                .or_else(|| {
                    log::debug!("generator produced an empty candidate, drawing from archive");
                    archive
                        .solution(rng)
                        .filter(|c| !c.is_empty())
                        .map(|c| (c, SampleSource::Archive))
                })
        } else {
            archive
                .solution(rng)
                .filter(|c| !c.is_empty())
                .map(|c| (c, SampleSource::Archive))
                .or_else(|| {
                    log::debug!("archive has no candidate, generating");
                    self.generate(rng).map(|c| (c, SampleSource::Generator))
                })
        };
        sampled.ok_or(Error::ResampleExhausted { iteration })
    }
}

impl std::fmt::Debug for HybridSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridSampler").finish_non_exhaustive()
    }
}
