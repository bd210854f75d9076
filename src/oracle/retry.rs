//! Bounded retry with explicit backoff

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Delay schedule between failed attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay after every attempt
    Fixed(Duration),
    /// `attempt × step`
    Linear {
        /// Delay unit
        step: Duration,
    },
    /// `initial × factor^(attempt - 1)`, capped at `max`
    Exponential {
        /// Delay after the first attempt
        initial: Duration,
        /// Growth factor
        factor: u32,
        /// Upper bound
        max: Duration,
    },
}

impl Backoff {
    /// Delay after failed attempt `attempt` (1-based)
    #[must_use]
    pub fn delay_after(&self, attempt: usize) -> Duration {
        let attempt = u32::try_from(attempt.max(1)).unwrap_or(u32::MAX);
        match *self {
            Self::Fixed(delay) => delay,
            Self::Linear { step } => step.saturating_mul(attempt),
            Self::Exponential {
                initial,
                factor,
                max,
            } => {
                let growth = factor.checked_pow(attempt - 1).unwrap_or(u32::MAX);
                initial.saturating_mul(growth).min(max)
            }
        }
    }
}

/// Suspension between attempts
pub trait Pause: Send + Sync {
    /// Wait for `duration`
    fn pause(&self, duration: Duration);
}

/// Blocks the current thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Every attempt failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("gave up after {attempts} attempts: {last_failure}")]
pub struct RetryExhausted<E: fmt::Display + fmt::Debug> {
    /// Attempts made
    pub attempts: usize,
    /// Failure of the final attempt
    pub last_failure: E,
}

/// Attempt limit plus delay schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts before giving up; at least one is always made
    pub max_attempts: usize,
    /// Delay schedule
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Linear {
                step: Duration::from_millis(100),
            },
        }
    }
}

impl RetryPolicy {
    /// Create a policy
    #[must_use]
    pub fn new(max_attempts: usize, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Run `op` until it succeeds or the attempts run out
    ///
    /// `op` receives the 1-based attempt number. Failed attempts are
    /// logged at debug level and followed by a pause, except the last.
    ///
    /// # Errors
    ///
    /// Returns [`RetryExhausted`] carrying the final failure
    pub fn run<T, E, F>(&self, pause: &dyn Pause, mut op: F) -> Result<T, RetryExhausted<E>>
    where
        E: fmt::Display + fmt::Debug,
        F: FnMut(usize) -> Result<T, E>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(failure) => {
                    log::debug!("attempt {attempt}/{attempts} failed: {failure}");
                    if attempt >= attempts {
                        return Err(RetryExhausted {
                            attempts,
                            last_failure: failure,
                        });
                    }
                    pause.pause(self.backoff.delay_after(attempt));
                    attempt += 1;
                }
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingPause;
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_linear_delays() {
        let backoff = Backoff::Linear { step: ms(100) };
        assert_eq!(backoff.delay_after(1), ms(100));
        assert_eq!(backoff.delay_after(2), ms(200));
        assert_eq!(backoff.delay_after(0), ms(100));
    }

    #[test]
    fn test_exponential_delays_are_capped() {
        let backoff = Backoff::Exponential {
            initial: ms(50),
            factor: 2,
            max: ms(150),
        };
        assert_eq!(backoff.delay_after(1), ms(50));
        assert_eq!(backoff.delay_after(2), ms(100));
        assert_eq!(backoff.delay_after(3), ms(150));
        assert_eq!(backoff.delay_after(40), ms(150));
    }

    #[test]
    fn test_success_on_first_attempt_never_pauses() {
        let pause = RecordingPause::default();
        let result: Result<u8, RetryExhausted<String>> =
            RetryPolicy::default().run(&pause, |_| Ok(4));
        assert_eq!(result.expect("should succeed"), 4);
        assert!(pause.recorded().is_empty());
    }

    #[test]
    fn test_exhaustion_skips_last_pause() {
        let pause = RecordingPause::default();
        let mut seen = Vec::new();
        let result: Result<(), _> = RetryPolicy::default().run(&pause, |attempt| {
            seen.push(attempt);
            Err(format!("failure {attempt}"))
        });
        let exhausted = result.expect_err("should exhaust");
        assert_eq!(exhausted.attempts, 3);
        assert_eq!(exhausted.last_failure, "failure 3");
        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(pause.recorded(), vec![ms(100), ms(200)]);
    }

    #[test]
    fn test_recovers_after_failures() {
        let pause = RecordingPause::default();
        let result = RetryPolicy::new(5, Backoff::Fixed(ms(10))).run(&pause, |attempt| {
            if attempt < 3 {
                Err("not yet")
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(result.expect("should succeed"), 3);
        assert_eq!(pause.recorded(), vec![ms(10), ms(10)]);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let pause = RecordingPause::default();
        let mut calls = 0;
        let result: Result<(), _> = RetryPolicy::new(0, Backoff::Fixed(ms(1))).run(&pause, |_| {
            calls += 1;
            Err("no")
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
