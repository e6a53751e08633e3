//! Backoff, jitter and retry policies for the condition waiter.
//!
//! This module groups the knobs that control **whether** a failed poll is
//! retried and **how long** to wait before the next one.
//!
//! ## Contents
//! - [`BackoffPolicy`] how delays evolve (min / max, doubling per attempt)
//! - [`JitterPolicy`]  randomization strategy to avoid synchronized retries
//! - [`RetryClassifier`] transient vs terminal API errors
//!
//! ## Quick wiring
//! ```text
//! WaiterOptions { min_delay, max_delay, jitter, classifier }
//!      └─► waiter::ConditionWaiter uses:
//!           - classifier.classify(err) to decide retry/abort
//!           - backoff.compute_delay(attempt, remaining) to schedule the next poll
//! ```

mod backoff;
mod jitter;
mod retry;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use retry::{
    EVENTUALLY_CONSISTENT_CODES, RETRYABLE_STATUSES, RetryClassifier, Retryability,
    THROTTLE_CODES, TRANSIENT_CODES,
};
