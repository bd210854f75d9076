//! Archive-guided evolutionary search
//!
//! [`Summit`] keeps one working candidate. Each iteration it resamples the
//! candidate if needed, mutates it, evaluates it (updating the archive),
//! anneals the sampling policy from the consumed budget, and shrinks the
//! archive's retention.
//!
//! # Annealing
//!
//! With consumed budget `u` and exploitation onset `E`:
//!
//! | Range | Generator probability `pr` | Retention `n` |
//! |-------|----------------------------|---------------|
//! | `u < E` | `pr0 * (1 - u/E)` | `ceil(n0 * (1 - u/E))` |
//! | `u >= E` | `0` | `1` |
//!
//! # Example
//!
//! ```rust,ignore
//! use summit::search::{LogObserver, SearchBudget, SearchConfig, Summit};
//!
//! let mut search = Summit::new(SearchConfig::default(), components)?;
//! let result = search.run(SearchBudget::evaluations(10_000), &mut LogObserver::new(100))?;
//! println!("{}", result.report());
//! ```

mod budget;
mod config;
mod observer;
mod policy;
mod result;
mod sampler;
mod summit;

pub use budget::SearchBudget;
pub use config::SearchConfig;
pub use observer::{IterationStats, LogObserver, NullObserver, SearchObserver};
pub use policy::{anneal, SamplingPolicy};
pub use result::{CriterionScore, SuiteReport, SuiteResult};
pub use sampler::{HybridSampler, SampleSource};
pub use summit::{SearchComponents, Summit};
