//! Summit - Archive-Guided Evolutionary Unit Test Generation
//!
//! Summit evolves executable test programs toward full coverage of a set
//! of goals for a unit under analysis. Candidates are ordered statement
//! sequences with strict backward-only references; a per-goal archive
//! keeps the best candidates found so far; a hybrid sampler alternates
//! between fresh generation (optionally guided by a text-generation
//! oracle) and exploitation of archived solutions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          SUMMIT                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Cluster  →  Generator  →  Mutator  →  Fitness  →  Archive  │
//! │  (types)     (sampling)    (in place)  (oracle)    (best)   │
//! │                  ↑                                   │      │
//! │                  └────────── Search loop ←───────────┘      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use summit::archive::CoverageArchive;
//! use summit::cluster::{ClassDecl, StaticCluster, Type, TypeCluster};
//! use summit::fitness::{FitnessOracle, MethodCoverageOracle};
//! use summit::generator::{ClusterInserter, GuidedFactory, RandomSelector};
//! use summit::mutator::StructuralMutator;
//! use summit::search::{NullObserver, SearchBudget, SearchComponents, SearchConfig, Summit};
//!
//! let cluster: Arc<dyn TypeCluster> = Arc::new(StaticCluster::new().with_class(
//!     ClassDecl::new("Stack")
//!         .with_constructor(vec![])
//!         .with_method("push", vec![Type::int()], Type::Void),
//! ));
//! let config = SearchConfig::default().with_seed(42);
//! let fitness = MethodCoverageOracle::new(Arc::clone(&cluster));
//! let goals: Vec<_> = fitness.goals().ids().collect();
//! let factory = || {
//!     let inserter = ClusterInserter::new(Arc::clone(&cluster), Box::new(RandomSelector::new()));
//!     GuidedFactory::new(Box::new(inserter), config.chromosome_length, config.max_attempts)
//! };
//! let inserter = ClusterInserter::new(Arc::clone(&cluster), Box::new(RandomSelector::new()));
//! let components = SearchComponents {
//!     archive: Box::new(CoverageArchive::new(goals, config.tests_per_target)),
//!     seed_factory: Box::new(factory()),
//!     guided_factory: Box::new(factory()),
//!     mutator: Box::new(StructuralMutator::new(
//!         Arc::clone(&cluster),
//!         Box::new(inserter),
//!         config.chromosome_length,
//!     )),
//!     fitness: Box::new(fitness),
//! };
//! let mut search = Summit::new(config, components)?;
//! let result = search.run(SearchBudget::evaluations(1000), &mut NullObserver)?;
//! println!("{}", result.report());
//! # Ok::<(), summit::Error>(())
//! ```
//!
//! # Modules
//!
//! - [`program`] - Candidate representation, dependency and slicing analysis
//! - [`cluster`] - Type model of the unit under analysis
//! - [`goals`] - Coverage goals and mutant limiting
//! - [`fitness`] - Fitness oracle contract and method coverage
//! - [`archive`] - Best-so-far candidates per goal
//! - [`generator`] - Statement insertion, variable selection, sampling
//! - [`mutator`] - Structural mutation (delete, change, insert)
//! - [`oracle`] - Text-generation oracle client with retry and backoff
//! - [`search`] - The search loop, annealing, and results

// Note: Lint configuration is in Cargo.toml [lints]
#![forbid(unsafe_code)]

pub mod archive;
pub mod chromosome;
pub mod cluster;
pub mod error;
pub mod fitness;
pub mod generator;
pub mod goals;
pub mod mutator;
pub mod oracle;
pub mod program;
pub mod search;

pub use error::{Error, Result};
