//! Annealing of the sampling policy

use super::SearchConfig;

/// Sampling probability and per-goal retention at one point of the search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingPolicy {
    /// Probability of sampling from the generator instead of the archive
    pub probability: f64,
    /// Candidates retained per uncovered goal
    pub retention: usize,
}

impl SamplingPolicy {
    /// Policy at the start of the search
    #[must_use]
    pub fn initial(config: &SearchConfig) -> Self {
        Self {
            probability: config.p_random_test_or_from_archive,
            retention: config.tests_per_target.max(1),
        }
    }

    /// Whether the search only exploits the archive
    #[must_use]
    pub fn is_exploiting(&self) -> bool {
        self.probability <= 0.0 && self.retention == 1
    }
}

/// Policy for consumed budget fraction `progress`
///
/// Decays linearly from the configured initial values to `(0, 1)` at
/// `exploitation_starts_at`, and stays there. Retention is rounded up.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn anneal(progress: f64, config: &SearchConfig) -> SamplingPolicy {
    let progress = progress.clamp(0.0, 1.0);
    let onset = config.exploitation_starts_at;
    if progress >= onset {
        return SamplingPolicy {
            probability: 0.0,
            retention: 1,
        };
    }
    let remaining = 1.0 - progress / onset;
    let probability = (config.p_random_test_or_from_archive * remaining).max(0.0);
    let retention = (config.tests_per_target as f64 * remaining).ceil() as usize;
    SamplingPolicy {
        probability,
        retention: retention.max(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SearchConfig {
        SearchConfig::default()
            .with_sampling(0.8, 10)
            .with_exploitation_starts_at(0.5)
    }

    #[test]
    fn test_anneal_start() {
        let policy = anneal(0.0, &config());
        assert!((policy.probability - 0.8).abs() < 1e-12);
        assert_eq!(policy.retention, 10);
        assert_eq!(policy, SamplingPolicy::initial(&config()));
    }

    #[test]
    fn test_anneal_halfway_to_onset() {
        let policy = anneal(0.25, &config());
        assert!((policy.probability - 0.4).abs() < 1e-12);
        assert_eq!(policy.retention, 5);
    }

    #[test]
    fn test_anneal_at_onset() {
        let policy = anneal(0.5, &config());
        assert!(policy.probability.abs() < f64::EPSILON);
        assert_eq!(policy.retention, 1);
        assert!(policy.is_exploiting());
    }

    #[test]
    fn test_anneal_rounds_up() {
        let config = SearchConfig::default()
            .with_sampling(0.5, 3)
            .with_exploitation_starts_at(1.0);
        // 3 * 0.9 = 2.7
        assert_eq!(anneal(0.1, &config).retention, 3);
        // 3 * 0.1 = 0.3
        assert_eq!(anneal(0.9, &config).retention, 1);
    }

    mod proptests {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(100))]

            #[test]
            fn prop_anneal_monotone_before_onset(
                a in 0.0f64..0.5,
                b in 0.0f64..0.5,
                pr0 in 0.0f64..=1.0,
                n0 in 1usize..50,
            ) {
                let config = SearchConfig::default()
                    .with_sampling(pr0, n0)
                    .with_exploitation_starts_at(0.5);
                let (u1, u2) = if a <= b { (a, b) } else { (b, a) };
                let early = anneal(u1, &config);
                let late = anneal(u2, &config);
                prop_assert!(late.probability <= early.probability);
                prop_assert!(late.retention <= early.retention);
                prop_assert!(late.probability >= 0.0);
                prop_assert!(late.retention >= 1);
            }

            #[test]
            fn prop_anneal_exploits_after_onset(
                u in 0.5f64..=1.0,
                pr0 in 0.0f64..=1.0,
                n0 in 1usize..50,
            ) {
                let config = SearchConfig::default()
                    .with_sampling(pr0, n0)
                    .with_exploitation_starts_at(0.5);
                let policy = anneal(u, &config);
                prop_assert!(policy.probability.abs() < f64::EPSILON);
                prop_assert_eq!(policy.retention, 1);
            }
        }
    }
}
