//! # Jitter policy for retry delays.
//!
//! [`JitterPolicy`] adds randomness to backoff delays so that many nodes polling
//! the same API do not retry in lockstep.
//!
//! Jitter is applied inside a range `[floor, ceiling]`, where `floor` is the
//! waiter's minimum delay and `ceiling` the exponential base delay:
//! - [`JitterPolicy::None`]: always `ceiling`, predictable delays
//! - [`JitterPolicy::Full`]: uniform in `[floor, ceiling)`
//! - [`JitterPolicy::Equal`]: uniform in the upper half of the range

use rand::Rng;
use std::time::Duration;

/// Policy controlling randomization of retry delays.
///
/// ## Trade-offs
/// - **None**: Predictable, but risks synchronized retries
/// - **Full**: Maximum spread across the whole range (default for waiters)
/// - **Equal**: Keeps at least half of the exponential growth
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum JitterPolicy {
    /// No jitter: use the exponential delay as is.
    ///
    /// Use when:
    /// - Only one caller polls the API
    /// - Testing/debugging
    None,

    /// Full jitter: uniform in `[floor, ceiling)`.
    #[default]
    Full,

    /// Equal jitter: `mid + random[0, ceiling - mid)` with `mid` halfway between floor and ceiling.
    Equal,
}

impl JitterPolicy {
    /// Applies jitter to `ceiling`, never going below `floor`.
    ///
    /// Returns `ceiling` unchanged when the range is empty (`ceiling <= floor`).
    pub fn apply(&self, floor: Duration, ceiling: Duration) -> Duration {
        if ceiling <= floor {
            return ceiling;
        }
        match self {
            JitterPolicy::None => ceiling,
            JitterPolicy::Full => random_between(floor, ceiling),
            JitterPolicy::Equal => {
                let mid = floor + (ceiling - floor) / 2;
                random_between(mid, ceiling)
            }
        }
    }
}

/// Uniform random duration in `[low, high)` with millisecond resolution.
fn random_between(low: Duration, high: Duration) -> Duration {
    let low_ms = millis(low);
    let high_ms = millis(high);
    if high_ms <= low_ms {
        return low;
    }
    let mut rng = rand::rng();
    Duration::from_millis(rng.random_range(low_ms..high_ms))
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_returns_ceiling() {
        let d = JitterPolicy::None.apply(Duration::from_secs(1), Duration::from_secs(8));
        assert_eq!(d, Duration::from_secs(8));
    }

    #[test]
    fn test_full_jitter_bounds() {
        let floor = Duration::from_secs(15);
        let ceiling = Duration::from_secs(60);
        for _ in 0..200 {
            let d = JitterPolicy::Full.apply(floor, ceiling);
            assert!(d >= floor, "{d:?} below floor");
            assert!(d < ceiling, "{d:?} reached ceiling");
        }
    }

    #[test]
    fn test_equal_jitter_keeps_upper_half() {
        let floor = Duration::from_secs(10);
        let ceiling = Duration::from_secs(30);
        for _ in 0..200 {
            let d = JitterPolicy::Equal.apply(floor, ceiling);
            assert!(d >= Duration::from_secs(20), "{d:?} below midpoint");
            assert!(d < ceiling);
        }
    }

    #[test]
    fn test_empty_range_is_passthrough() {
        let d = Duration::from_secs(5);
        assert_eq!(JitterPolicy::Full.apply(d, d), d);
        assert_eq!(JitterPolicy::Equal.apply(Duration::from_secs(9), d), d);
    }
}
