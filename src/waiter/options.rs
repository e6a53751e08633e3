use std::time::Duration;

use crate::{
    error::WaitError,
    policies::{BackoffPolicy, JitterPolicy, RetryClassifier},
};

/// Default floor between polls.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(15);
/// Default cap between polls; also used when `max_delay` is zero.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(120);

/// Per-wait tuning of the condition waiter.
///
/// ## Defaults
/// | Field               | Default               |
/// |---------------------|-----------------------|
/// | `min_delay`         | `15s`                 |
/// | `max_delay`         | `120s`                |
/// | `jitter`            | `JitterPolicy::Full`  |
/// | `classifier`        | default retryable set |
/// | `log_wait_attempts` | `false`               |
#[derive(Clone, Debug)]
pub struct WaiterOptions {
    /// Minimum delay between polls.
    pub min_delay: Duration,
    /// Maximum delay between polls (`0` means the default).
    pub max_delay: Duration,
    /// Jitter applied to the exponential delay.
    pub jitter: JitterPolicy,
    /// Decides which API errors are retried.
    pub classifier: RetryClassifier,
    /// Publish a `WaitAttemptStarting` event before every poll.
    pub log_wait_attempts: bool,
}

impl Default for WaiterOptions {
    fn default() -> Self {
        Self {
            min_delay: DEFAULT_MIN_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: JitterPolicy::default(),
            classifier: RetryClassifier::default(),
            log_wait_attempts: false,
        }
    }
}

impl WaiterOptions {
    /// Sets both delay bounds.
    #[must_use]
    pub fn with_delays(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self.max_delay = max_delay;
        self
    }

    /// Sets the jitter policy.
    #[must_use]
    pub fn with_jitter(mut self, jitter: JitterPolicy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Replaces the retry classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: RetryClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Enables per-attempt events.
    #[must_use]
    pub fn with_attempt_logging(mut self, enabled: bool) -> Self {
        self.log_wait_attempts = enabled;
        self
    }

    pub(crate) fn backoff(&self) -> Result<BackoffPolicy, WaitError> {
        let max_delay = if self.max_delay.is_zero() {
            DEFAULT_MAX_DELAY
        } else {
            self.max_delay
        };
        Ok(BackoffPolicy::new(self.min_delay, max_delay)?.with_jitter(self.jitter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_max_delay_falls_back_to_default() {
        let opts = WaiterOptions::default().with_delays(Duration::from_secs(1), Duration::ZERO);
        assert_eq!(opts.backoff().unwrap().max_delay(), DEFAULT_MAX_DELAY);
    }

    #[test]
    fn test_min_above_max_is_rejected() {
        let opts = WaiterOptions::default()
            .with_delays(Duration::from_secs(30), Duration::from_secs(10));
        assert_eq!(opts.backoff().unwrap_err().as_label(), "wait_configuration");
    }

    #[test]
    fn test_min_above_default_max_is_rejected() {
        let opts = WaiterOptions::default()
            .with_delays(Duration::from_secs(300), Duration::ZERO);
        assert!(opts.backoff().is_err());
    }
}
