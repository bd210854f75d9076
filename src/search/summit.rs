//! The archive-guided search loop

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::{
    anneal, HybridSampler, IterationStats, SamplingPolicy, SearchBudget, SearchConfig,
    SearchObserver, SuiteResult,
};
use crate::archive::Archive;
use crate::chromosome::Chromosome;
use crate::fitness::{Evaluation, FitnessOracle};
use crate::generator::ChromosomeFactory;
use crate::goals::GoalId;
use crate::mutator::ProgramMutator;
use crate::{Error, Result};

/// Collaborators of a search run
pub struct SearchComponents {
    /// Fitness of a program per goal
    pub fitness: Box<dyn FitnessOracle>,
    /// Best-so-far store
    pub archive: Box<dyn Archive>,
    /// Builds the initial candidate
    pub seed_factory: Box<dyn ChromosomeFactory>,
    /// Builds candidates when resampling from the generator
    pub guided_factory: Box<dyn ChromosomeFactory>,
    /// Mutates the working candidate
    pub mutator: Box<dyn ProgramMutator>,
}

/// Single-threaded archive-guided evolutionary search
///
/// One working candidate is mutated and evaluated per iteration. It is
/// replaced by a sampled one once it has used up its mutation or
/// evaluation allowance; sampling prefers the generator early and the
/// archive late, as [`anneal`] decays the policy.
pub struct Summit {
    config: SearchConfig,
    fitness: Box<dyn FitnessOracle>,
    archive: Box<dyn Archive>,
    seed_factory: Box<dyn ChromosomeFactory>,
    sampler: HybridSampler,
    mutator: Box<dyn ProgramMutator>,
    rng: StdRng,
    current: Option<Chromosome>,
    policy: SamplingPolicy,
    iteration: usize,
}

impl Summit {
    /// Create a search
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the configuration is invalid
    pub fn new(config: SearchConfig, components: SearchComponents) -> Result<Self> {
        config.validate()?;
        let rng = config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Ok(Self {
            policy: SamplingPolicy::initial(&config),
            config,
            fitness: components.fitness,
            archive: components.archive,
            seed_factory: components.seed_factory,
            sampler: HybridSampler::new(components.guided_factory),
            mutator: components.mutator,
            rng,
            current: None,
            iteration: 0,
        })
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Current sampling policy
    #[must_use]
    pub fn policy(&self) -> SamplingPolicy {
        self.policy
    }

    /// Iterations completed
    #[must_use]
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Working candidate, if any
    #[must_use]
    pub fn current(&self) -> Option<&Chromosome> {
        self.current.as_ref()
    }

    /// Archive state
    #[must_use]
    pub fn archive(&self) -> &dyn Archive {
        self.archive.as_ref()
    }

    fn evaluate(&mut self, chromosome: &mut Chromosome, budget: &mut SearchBudget) -> Result<Evaluation> {
        let evaluation = self.fitness.evaluate(chromosome.program())?;
        chromosome.record_evaluation(&evaluation);
        budget.record_evaluation();
        if self.archive.update(chromosome, &evaluation) {
            log::debug!(
                "archive updated at iteration {}: {} goals covered",
                self.iteration,
                self.archive.covered_goals().len()
            );
        }
        Ok(evaluation)
    }

    /// Build and evaluate the seed candidate
    ///
    /// # Errors
    ///
    /// Returns an error if the fitness oracle fails
    pub fn initialize(&mut self, budget: &mut SearchBudget) -> Result<()> {
        let mut seed = self.seed_factory.chromosome(&mut self.rng);
        log::debug!("seed candidate has {} statements", seed.len());
        self.evaluate(&mut seed, budget)?;
        self.current = Some(seed);
        Ok(())
    }

    fn needs_resample(&self) -> bool {
        self.current.as_ref().map_or(true, |c| {
            c.mutations() >= self.config.max_mutations_before_giving_up
                || c.evaluations() >= self.config.max_evaluations_before_giving_up
        })
    }

    /// Run one iteration
    ///
    /// # Errors
    ///
    /// Returns `ResampleExhausted` if a new working candidate was needed and
    /// neither source produced one, or the fitness oracle's error
    pub fn evolve(&mut self, budget: &mut SearchBudget) -> Result<IterationStats> {
        let mut resampled = None;
        if self.needs_resample() {
            let sampled = self.sampler.sample(
                self.archive.as_mut(),
                self.policy.probability,
                self.iteration,
                &mut self.rng,
            );
            let (chromosome, source) = match sampled {
                Ok(sampled) => sampled,
                Err(err) => {
                    debug_assert!(
                        self.archive.is_empty(),
                        "a non-empty archive must yield a candidate"
                    );
                    log::error!("{err}");
                    return Err(err);
                }
            };
            log::debug!("resampled {} statements from the {source}", chromosome.len());
            self.current = Some(chromosome);
            resampled = Some(source);
        }

        let Some(mut current) = self.current.take() else {
            return Err(Error::ResampleExhausted {
                iteration: self.iteration,
            });
        };
        let mutated = self.mutator.mutate(current.program_mut(), &mut self.rng);
        current.record_mutation();
        debug_assert!(
            current.program().is_valid(),
            "invalid after mutation:\n{}",
            current.program().to_code()
        );
        let evaluated = self.evaluate(&mut current, budget);
        let length = current.len();
        self.current = Some(current);
        evaluated?;

        let progress = budget.progress();
        self.policy = anneal(progress, &self.config);
        log::debug!(
            "iteration {}: progress {progress:.3}, pr {:.3}, n {}",
            self.iteration,
            self.policy.probability,
            self.policy.retention
        );
        self.archive.shrink_solutions(self.policy.retention);
        self.iteration += 1;

        Ok(IterationStats {
            iteration: self.iteration,
            progress,
            probability: self.policy.probability,
            retention: self.policy.retention,
            covered: self.archive.covered_goals().len(),
            goals: self.fitness.goals().len(),
            length,
            resampled,
            mutated,
        })
    }

    fn all_covered(&self) -> bool {
        let goals = self.fitness.goals();
        !goals.is_empty() && self.archive.covered_goals().len() >= goals.len()
    }

    /// Search until the budget is used up or every goal is covered
    ///
    /// # Errors
    ///
    /// Returns the first error of [`Summit::initialize`] or [`Summit::evolve`]
    pub fn run(
        &mut self,
        mut budget: SearchBudget,
        observer: &mut dyn SearchObserver,
    ) -> Result<SuiteResult> {
        budget.start();
        observer.search_started(self.fitness.goals().len());
        self.initialize(&mut budget)?;
        while !budget.is_finished() && !self.all_covered() {
            let stats = self.evolve(&mut budget)?;
            observer.iteration(&stats);
        }
        log::info!(
            "search stopped after {} iterations and {} evaluations",
            self.iteration,
            budget.consumed_evaluations()
        );

        let mut result = self.finalize(self.config.finalize_timeout());
        result.iterations = self.iteration;
        result.evaluations = budget.consumed_evaluations();
        result.elapsed = budget.elapsed();
        observer.search_finished(&result);
        Ok(result)
    }

    /// Collect the archive's covering programs into one suite
    ///
    /// Each program is re-evaluated to recompute the suite's coverage
    /// until `timeout` expires; the rest keep the archive's values and
    /// the result is marked incomplete.
    pub fn finalize(&mut self, timeout: Duration) -> SuiteResult {
        let goals = self.fitness.goals().clone();
        if self.archive.is_empty() {
            log::info!("archive is empty, reporting an empty suite");
            return SuiteResult::empty(&goals);
        }

        let deadline = Instant::now() + timeout;
        let programs = self.archive.solutions();
        let mut best: BTreeMap<GoalId, f64> = goals
            .ids()
            .map(|g| (g, self.archive.best_fitness(g)))
            .collect();
        let mut complete = true;
        for program in &programs {
            if Instant::now() >= deadline {
                log::warn!("finalization deadline reached, suite coverage not recomputed");
                complete = false;
                break;
            }
            match self.fitness.evaluate(program) {
                Ok(evaluation) => {
                    for (goal, value) in best.iter_mut() {
                        *value = value.min(evaluation.fitness(*goal));
                    }
                }
                Err(err) => log::warn!("re-evaluating a suite program failed: {err}"),
            }
        }

        let mut result = SuiteResult::scored(&goals, programs, &best);
        result.complete = complete;
        result
    }
}

impl std::fmt::Debug for Summit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Summit")
            .field("config", &self.config)
            .field("policy", &self.policy)
            .field("iteration", &self.iteration)
            .finish_non_exhaustive()
    }
}
