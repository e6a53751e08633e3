//! # Retry classification for remote API errors.
//!
//! [`RetryClassifier`] decides whether an [`ApiError`] is worth another poll.
//!
//! ## Rules (first match wins)
//! ```text
//! kind == Timeout            → Retryability::Timeout
//! explicit retryable hint    → Retryable / Terminal
//! kind == Connection         → Retryable
//! code in retryable codes    → Retryable   (throttling, transient, not-found-yet)
//! status in 500/502/503/504  → Retryable
//! anything else              → Terminal
//! ```
//!
//! Timeouts and retryable errors lead to the same decision (back off and poll
//! again); they are kept apart so events and logs can tell them apart.

use std::{borrow::Cow, collections::BTreeSet};

use crate::error::ApiError;

/// Throttling error codes returned by cloud control planes.
pub const THROTTLE_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "ThrottledException",
    "RequestThrottledException",
    "TooManyRequestsException",
    "ProvisionedThroughputExceededException",
    "TransactionInProgressException",
    "RequestLimitExceeded",
    "BandwidthLimitExceeded",
    "LimitExceededException",
    "RequestThrottled",
    "SlowDown",
    "PriorRequestNotComplete",
    "EC2ThrottledException",
];

/// Transient service-side error codes.
pub const TRANSIENT_CODES: &[&str] = &["RequestTimeout", "RequestTimeoutException"];

/// Not-found codes returned for resources that were just created and are not
/// yet visible through the describe API.
pub const EVENTUALLY_CONSISTENT_CODES: &[&str] = &["InvalidInstanceID.NotFound"];

/// HTTP statuses treated as transient service faults.
pub const RETRYABLE_STATUSES: &[u16] = &[500, 502, 503, 504];

/// Outcome of classifying an [`ApiError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Retryability {
    /// The request timed out; poll again.
    Timeout,
    /// Transient fault (throttling, 5xx, not-found-yet); poll again.
    Retryable,
    /// Retrying cannot change the outcome.
    Terminal,
}

impl Retryability {
    /// True for [`Retryability::Timeout`] and [`Retryability::Retryable`].
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Retryability::Terminal)
    }

    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            Retryability::Timeout => "timeout",
            Retryability::Retryable => "retryable",
            Retryability::Terminal => "terminal",
        }
    }
}

/// Decides whether API errors are transient or terminal.
///
/// [`RetryClassifier::default`] knows the throttling, transient and
/// eventual-consistency codes above plus the 5xx statuses; extend it with
/// [`with_retryable_code`](Self::with_retryable_code) for API-specific codes.
#[derive(Clone, Debug)]
pub struct RetryClassifier {
    codes: BTreeSet<Cow<'static, str>>,
    statuses: BTreeSet<u16>,
}

impl Default for RetryClassifier {
    fn default() -> Self {
        let codes = THROTTLE_CODES
            .iter()
            .chain(TRANSIENT_CODES)
            .chain(EVENTUALLY_CONSISTENT_CODES)
            .map(|c| Cow::Borrowed(*c))
            .collect();
        Self {
            codes,
            statuses: RETRYABLE_STATUSES.iter().copied().collect(),
        }
    }
}

impl RetryClassifier {
    /// Classifier with no retryable codes or statuses; only timeouts,
    /// connection errors and explicit hints are retried.
    pub fn empty() -> Self {
        Self {
            codes: BTreeSet::new(),
            statuses: BTreeSet::new(),
        }
    }

    /// Marks an additional error code as retryable.
    #[must_use]
    pub fn with_retryable_code(mut self, code: impl Into<Cow<'static, str>>) -> Self {
        self.codes.insert(code.into());
        self
    }

    /// Marks an additional HTTP status as retryable.
    #[must_use]
    pub fn with_retryable_status(mut self, status: u16) -> Self {
        self.statuses.insert(status);
        self
    }

    /// Classifies one API error.
    pub fn classify(&self, err: &ApiError) -> Retryability {
        use crate::error::ApiErrorKind;

        if err.kind() == ApiErrorKind::Timeout {
            return Retryability::Timeout;
        }
        match err.retryable_hint() {
            Some(true) => return Retryability::Retryable,
            Some(false) => return Retryability::Terminal,
            None => {}
        }
        if err.kind() == ApiErrorKind::Connection {
            return Retryability::Retryable;
        }
        if err.code().is_some_and(|c| self.codes.contains(c)) {
            return Retryability::Retryable;
        }
        if err.status().is_some_and(|s| self.statuses.contains(&s)) {
            return Retryability::Retryable;
        }
        Retryability::Terminal
    }
}
