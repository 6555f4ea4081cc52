//! Retry with exponential backoff
//!
//! Wraps any async operation: up to `max_attempts` tries, waiting
//! `base_delay_ms * multiplier^n` after the n-th failure (0-based). The last
//! error is returned once attempts run out.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::platform::Sleeper;

/// Retry policy parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first (0 is treated as 1)
    pub max_attempts: u32,
    /// Wait after the first failure
    pub base_delay_ms: u64,
    /// Growth factor between consecutive waits
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Wait before retrying after failed attempt `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.multiplier).saturating_pow(attempt);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Run `op` under `policy`. `op` receives the 0-based attempt number.
pub async fn retry_with_backoff<T, E, F, Fut, S>(
    policy: &RetryPolicy,
    sleeper: &S,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    S: Sleeper,
{
    let attempts = policy.attempts();
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 >= attempts => {
                log::warn!("Attempt {} of {attempts} failed: {err}. Giving up", attempt + 1);
                return Err(err);
            }
            Err(err) => {
                let delay = policy.delay_for(attempt);
                log::warn!(
                    "Attempt {} of {attempts} failed: {err}. Retrying in {}ms",
                    attempt + 1,
                    delay.as_millis()
                );
                sleeper.sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::InstantSleeper;
    use futures::executor::block_on;
    use std::cell::Cell;

    #[test]
    fn test_delays_double() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
    }

    #[test]
    fn test_delay_saturates() {
        let policy = RetryPolicy {
            max_attempts: 100,
            base_delay_ms: u64::MAX / 2,
            multiplier: 10,
        };
        assert_eq!(policy.delay_for(50), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn test_first_success_does_not_wait() {
        let sleeper = InstantSleeper::new();
        let result: Result<u32, String> =
            block_on(retry_with_backoff(&RetryPolicy::default(), &sleeper, |_| async { Ok(7) }));
        assert_eq!(result, Ok(7));
        assert!(sleeper.requested().is_empty());
    }

    #[test]
    fn test_succeeds_on_third_attempt() {
        let sleeper = InstantSleeper::new();
        let calls = Cell::new(0);
        let result: Result<&str, String> = block_on(retry_with_backoff(
            &RetryPolicy::default(),
            &sleeper,
            |attempt| {
                calls.set(calls.get() + 1);
                async move {
                    if attempt < 2 {
                        Err(format!("boom {attempt}"))
                    } else {
                        Ok("saved")
                    }
                }
            },
        ));

        assert_eq!(result, Ok("saved"));
        assert_eq!(calls.get(), 3);
        assert_eq!(
            sleeper.requested(),
            vec![Duration::from_millis(1000), Duration::from_millis(2000)]
        );
        assert_eq!(sleeper.total(), Duration::from_millis(3000));
    }

    #[test]
    fn test_exhaustion_returns_last_error() {
        let sleeper = InstantSleeper::new();
        let result: Result<(), String> = block_on(retry_with_backoff(
            &RetryPolicy::default(),
            &sleeper,
            |attempt| async move { Err(format!("failure {attempt}")) },
        ));
        assert_eq!(result, Err("failure 2".to_string()));
        // No wait after the final attempt
        assert_eq!(sleeper.requested().len(), 2);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let sleeper = InstantSleeper::new();
        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        let calls = Cell::new(0);
        let result: Result<(), String> = block_on(retry_with_backoff(&policy, &sleeper, |_| {
            calls.set(calls.get() + 1);
            async { Err("nope".to_string()) }
        }));
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }
}
