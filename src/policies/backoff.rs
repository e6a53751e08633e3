//! # Backoff policy for waiter retries.
//!
//! [`BackoffPolicy`] controls how the delay between two polls grows.
//! It is parameterized by:
//! - [`BackoffPolicy::min_delay`] the floor, also the first delay;
//! - [`BackoffPolicy::max_delay`] the cap;
//! - a [`JitterPolicy`] applied between the floor and the exponential base.
//!
//! For attempt `n` (1-based) the base is `min_delay × 2^(n-1)`, clamped to
//! `max_delay`. Jitter then picks a value in `[min_delay, base)`. Finally the
//! delay is fitted into the remaining budget: if sleeping it would leave no
//! room for one more attempt (`remaining - delay <= min_delay`), the delay
//! shrinks to `remaining - min_delay` so the last poll still fits.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use nodevisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy::new(Duration::from_secs(1), Duration::from_secs(10))
//!     .unwrap()
//!     .with_jitter(JitterPolicy::None);
//! let plenty = Duration::from_secs(3600);
//!
//! assert_eq!(backoff.compute_delay(1, plenty), Duration::from_secs(1));
//! assert_eq!(backoff.compute_delay(3, plenty), Duration::from_secs(4));
//! // 1s × 2^9 → capped at max
//! assert_eq!(backoff.compute_delay(10, plenty), Duration::from_secs(10));
//! // not enough budget for the full delay plus one more attempt
//! assert_eq!(backoff.compute_delay(10, Duration::from_secs(5)), Duration::from_secs(4));
//! ```

use std::time::Duration;

use crate::{error::WaitError, policies::jitter::JitterPolicy};

/// Exponential backoff bounded by a minimum and a maximum delay.
///
/// The invariant `0 < min_delay <= max_delay` is checked by [`BackoffPolicy::new`],
/// so a constructed policy is always usable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    min_delay: Duration,
    max_delay: Duration,
    jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns a policy with:
    /// - `min_delay = 15s`;
    /// - `max_delay = 120s`;
    /// - `jitter = JitterPolicy::Full`.
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(15),
            max_delay: Duration::from_secs(120),
            jitter: JitterPolicy::Full,
        }
    }
}

impl BackoffPolicy {
    /// Creates a policy, failing fast on an unusable range.
    ///
    /// # Errors
    /// [`WaitError::Configuration`] if `min_delay` is zero or greater than `max_delay`.
    pub fn new(min_delay: Duration, max_delay: Duration) -> Result<Self, WaitError> {
        if min_delay.is_zero() {
            return Err(WaitError::configuration(
                "minimum waiter delay must be greater than zero",
            ));
        }
        if min_delay > max_delay {
            return Err(WaitError::configuration(format!(
                "minimum waiter delay {min_delay:?} must be lesser than or equal to maximum waiter delay of {max_delay:?}"
            )));
        }
        Ok(Self {
            min_delay,
            max_delay,
            jitter: JitterPolicy::Full,
        })
    }

    /// Returns a new policy with the given jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: JitterPolicy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Floor of every computed delay (except the last-attempt clamp).
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Cap of the exponential base.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Jitter applied to the exponential base.
    pub fn jitter(&self) -> JitterPolicy {
        self.jitter
    }

    /// Computes the delay before the poll following `attempt` (1-based).
    ///
    /// The result always lies in `[0, remaining]`.
    /// `attempt == 0` or an exhausted budget yields `Duration::ZERO`.
    pub fn compute_delay(&self, attempt: u32, remaining: Duration) -> Duration {
        if attempt == 0 || remaining.is_zero() {
            return Duration::ZERO;
        }

        let base = self.exponential(attempt);
        let delay = if base == self.min_delay {
            base
        } else {
            self.jitter.apply(self.min_delay, base)
        };

        // Last attempt: leave exactly `min_delay` for the final poll.
        if remaining.saturating_sub(delay) <= self.min_delay {
            return remaining.saturating_sub(self.min_delay);
        }
        delay
    }

    /// `min_delay × 2^(attempt-1)`, saturating at `max_delay`.
    fn exponential(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1);
        if shift >= u32::BITS {
            return self.max_delay;
        }
        self.min_delay
            .checked_mul(1u32 << shift)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    fn fixed(min: u64, max: u64) -> BackoffPolicy {
        BackoffPolicy::new(Duration::from_secs(min), Duration::from_secs(max))
            .unwrap()
            .with_jitter(JitterPolicy::None)
    }

    #[test]
    fn test_rejects_min_above_max() {
        let err = BackoffPolicy::new(Duration::from_secs(30), Duration::from_secs(10)).unwrap_err();
        assert!(matches!(err, WaitError::Configuration { .. }));
    }

    #[test]
    fn test_rejects_zero_min() {
        let err = BackoffPolicy::new(Duration::ZERO, Duration::from_secs(10)).unwrap_err();
        assert!(matches!(err, WaitError::Configuration { .. }));
    }

    #[test]
    fn test_equal_min_and_max_is_constant() {
        let policy = BackoffPolicy::new(Duration::from_secs(5), Duration::from_secs(5)).unwrap();
        for attempt in 1..20 {
            assert_eq!(policy.compute_delay(attempt, HOUR), Duration::from_secs(5));
        }
    }

    #[test]
    fn test_exponential_growth_no_jitter() {
        let policy = fixed(15, 120);
        assert_eq!(policy.compute_delay(1, HOUR), Duration::from_secs(15));
        assert_eq!(policy.compute_delay(2, HOUR), Duration::from_secs(30));
        assert_eq!(policy.compute_delay(3, HOUR), Duration::from_secs(60));
        assert_eq!(policy.compute_delay(4, HOUR), Duration::from_secs(120));
        assert_eq!(policy.compute_delay(5, HOUR), Duration::from_secs(120));
    }

    #[test]
    fn test_non_power_of_two_range_clamps_to_max() {
        let policy = fixed(15, 100);
        assert_eq!(policy.compute_delay(3, HOUR), Duration::from_secs(60));
        assert_eq!(policy.compute_delay(4, HOUR), Duration::from_secs(100));
    }

    #[test]
    fn test_huge_attempt_clamps_to_max() {
        let policy = fixed(1, 60);
        assert_eq!(policy.compute_delay(40, HOUR), Duration::from_secs(60));
        assert_eq!(policy.compute_delay(u32::MAX, HOUR), Duration::from_secs(60));
    }

    #[test]
    fn test_zero_attempt_or_budget_yields_zero() {
        let policy = fixed(1, 60);
        assert_eq!(policy.compute_delay(0, HOUR), Duration::ZERO);
        assert_eq!(policy.compute_delay(3, Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn test_last_attempt_leaves_min_delay() {
        let policy = fixed(15, 120);
        // base 60s, but only 70s remain: 70 - 60 = 10 <= 15 → 70 - 15
        assert_eq!(
            policy.compute_delay(3, Duration::from_secs(70)),
            Duration::from_secs(55)
        );
        // exactly min_delay left after sleeping also triggers the clamp
        assert_eq!(
            policy.compute_delay(1, Duration::from_secs(30)),
            Duration::from_secs(15)
        );
    }

    #[test]
    fn test_delay_never_exceeds_remaining() {
        let policy = BackoffPolicy::new(Duration::from_secs(2), Duration::from_secs(64)).unwrap();
        for attempt in 1..12 {
            for remaining_secs in [0u64, 1, 2, 3, 5, 17, 64, 65, 200, 5000] {
                let remaining = Duration::from_secs(remaining_secs);
                let d = policy.compute_delay(attempt, remaining);
                assert!(
                    d <= remaining,
                    "attempt {attempt}: delay {d:?} exceeds remaining {remaining:?}"
                );
            }
        }
    }

    #[test]
    fn test_full_jitter_stays_within_min_and_base() {
        let policy = BackoffPolicy::new(Duration::from_secs(15), Duration::from_secs(120)).unwrap();
        for _ in 0..100 {
            let d = policy.compute_delay(3, HOUR);
            assert!(d >= Duration::from_secs(15), "{d:?}");
            assert!(d < Duration::from_secs(60), "{d:?}");
        }
    }

    #[test]
    fn test_jittered_delay_grows_on_average() {
        let policy = BackoffPolicy::new(Duration::from_secs(1), Duration::from_secs(120)).unwrap();
        let mean = |attempt: u32| -> u128 {
            (0..200)
                .map(|_| policy.compute_delay(attempt, HOUR).as_millis())
                .sum::<u128>()
                / 200
        };
        let early = mean(2);
        let middle = mean(5);
        let late = mean(12);
        assert!(early < middle, "early={early} middle={middle}");
        assert!(middle < late, "middle={middle} late={late}");
        assert!(late <= 120_000);
    }
}
