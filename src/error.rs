//! Error types used by the waiter, the composer, the daemons and the orchestrator.
//!
//! - [`ApiError`]: failures reported by a remote describe call (input to the retry classifier).
//! - [`ConditionError`]: a condition could not interpret a successful response.
//! - [`WaitError`]: outcomes of [`ConditionWaiter::wait`](crate::ConditionWaiter::wait).
//! - [`ComposeError`]: malformed or unmergeable configuration fragments.
//! - [`DaemonError`]: failures inside a single daemon phase.
//! - [`BootstrapError`]: what the orchestrator surfaces to the caller.
//!
//! Every enum provides `as_label` (stable snake_case) for events and logs.

use std::{path::PathBuf, time::Duration};

use thiserror::Error;

use crate::daemons::Phase;

/// Transport-level category of an [`ApiError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// The request did not complete in time (client or server side).
    Timeout,
    /// The request never reached the service (DNS, refused, reset).
    Connection,
    /// The service answered with an error response.
    Service,
}

/// Error reported by a remote describe API.
///
/// Clients map their native errors into this shape so the
/// [`RetryClassifier`](crate::RetryClassifier) can decide what to do with it.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("{}{}: {message}", kind_prefix(.kind), details(.code, .status))]
pub struct ApiError {
    kind: ApiErrorKind,
    code: Option<String>,
    status: Option<u16>,
    message: String,
    retryable: Option<bool>,
}

impl ApiError {
    fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            status: None,
            message: message.into(),
            retryable: None,
        }
    }

    /// Service error with an API error code (e.g. `"UnauthorizedOperation"`).
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        let mut err = Self::new(ApiErrorKind::Service, message);
        err.code = Some(code.into());
        err
    }

    /// Service error identified only by its HTTP status.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Service, message).with_status(status)
    }

    /// Request timed out.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Timeout, message)
    }

    /// Request could not reach the service.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Connection, message)
    }

    /// Attaches the HTTP status of the failed response.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches an explicit retryable hint from the client; overrides code/status rules.
    #[must_use]
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    /// Transport category.
    pub fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    /// API error code, if the service returned one.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// HTTP status, if known.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Explicit retryable hint, if the client set one.
    pub fn retryable_hint(&self) -> Option<bool> {
        self.retryable
    }
}

fn kind_prefix(kind: &ApiErrorKind) -> &'static str {
    match kind {
        ApiErrorKind::Timeout => "api timeout",
        ApiErrorKind::Connection => "api connection error",
        ApiErrorKind::Service => "api error",
    }
}

fn details(code: &Option<String>, status: &Option<u16>) -> String {
    let mut out = String::new();
    if let Some(code) = code {
        out.push_str(&format!(" code={code}"));
    }
    if let Some(status) = status {
        out.push_str(&format!(" status={status}"));
    }
    out
}

/// A condition failed to interpret a successful API response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct ConditionError {
    reason: String,
}

impl ConditionError {
    /// Creates a condition error with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// The reason given by the condition.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// # Errors produced by the condition waiter.
///
/// Retryable and timeout API errors never surface directly; they drive backoff
/// and are reported as `last_error` once the budget is exhausted.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WaitError {
    /// Invalid waiter parameters, detected before any API call.
    #[error("invalid waiter configuration: {reason}")]
    Configuration {
        /// What was wrong.
        reason: String,
    },

    /// The API returned an error that retrying cannot fix.
    #[error("terminal api error on attempt {attempt}: {source}")]
    Terminal {
        /// Attempt that produced the error (1-based).
        attempt: u32,
        /// The error exactly as returned by the API.
        source: ApiError,
    },

    /// The condition could not evaluate a successful response.
    #[error("condition evaluation failed on attempt {attempt}: {source}")]
    Condition {
        /// Attempt whose response could not be evaluated.
        attempt: u32,
        /// Error returned by the condition.
        source: ConditionError,
    },

    /// The time budget ran out before the condition was met.
    #[error("exceeded max wait time {max_wait:?} after {attempts} attempts")]
    DeadlineExceeded {
        /// The configured maximum wait.
        max_wait: Duration,
        /// Number of API calls issued.
        attempts: u32,
        /// Last retryable error observed, if any.
        last_error: Option<ApiError>,
    },

    /// The caller cancelled the wait, or the deadline fired mid-sleep.
    #[error("wait cancelled while {during}")]
    Cancelled {
        /// Where the cancellation was observed.
        during: &'static str,
    },
}

impl WaitError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            WaitError::Configuration { .. } => "wait_configuration",
            WaitError::Terminal { .. } => "wait_terminal_api_error",
            WaitError::Condition { .. } => "wait_condition_error",
            WaitError::DeadlineExceeded { .. } => "wait_deadline_exceeded",
            WaitError::Cancelled { .. } => "wait_cancelled",
        }
    }

    /// The API error carried by this failure, if any.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            WaitError::Terminal { source, .. } => Some(source),
            WaitError::DeadlineExceeded { last_error, .. } => last_error.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        WaitError::Configuration {
            reason: reason.into(),
        }
    }
}

/// # Errors produced while composing configuration fragments.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ComposeError {
    /// A TOML fragment failed to parse.
    #[error("fragment {fragment:?} is not valid toml: {source}")]
    Parse {
        /// Name of the offending fragment.
        fragment: String,
        /// Parser error.
        source: toml::de::Error,
    },

    /// A structured fragment could not be represented as a table.
    #[error("fragment {fragment:?} is not a table: {reason}")]
    NotATable {
        /// Name of the offending fragment.
        fragment: String,
        /// Why the conversion failed.
        reason: String,
    },

    /// The merged document could not be rendered.
    #[error("rendering merged document as {format} failed: {reason}")]
    Render {
        /// Output format (`toml` or `json`).
        format: &'static str,
        /// Encoder error message.
        reason: String,
    },
}

impl ComposeError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            ComposeError::Parse { .. } => "compose_parse",
            ComposeError::NotATable { .. } => "compose_not_a_table",
            ComposeError::Render { .. } => "compose_render",
        }
    }
}

/// # Errors produced inside a daemon phase.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DaemonError {
    /// Composing the daemon's configuration failed.
    #[error(transparent)]
    Compose(#[from] ComposeError),

    /// Writing a file to disk failed.
    #[error("writing {path}: {source}")]
    Write {
        /// Target path.
        path: PathBuf,
        /// I/O error.
        source: std::io::Error,
    },

    /// The daemon manager could not start a unit.
    #[error("starting unit {unit:?} failed: {reason}")]
    UnitStart {
        /// Unit name.
        unit: String,
        /// Manager-provided reason.
        reason: String,
    },
}

impl DaemonError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            DaemonError::Compose(e) => e.as_label(),
            DaemonError::Write { .. } => "daemon_write",
            DaemonError::UnitStart { .. } => "daemon_unit_start",
        }
    }
}

/// # Errors surfaced by a bootstrap run.
///
/// Any error aborts the whole run; files already written stay on disk.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// A daemon phase failed.
    #[error("daemon {daemon:?} failed in phase {phase}: {source}")]
    Phase {
        /// Daemon name.
        daemon: String,
        /// Phase that failed.
        phase: Phase,
        /// Underlying failure.
        source: DaemonError,
    },

    /// A termination signal arrived before the run completed.
    #[error("bootstrap interrupted by termination signal")]
    Interrupted,
}

impl BootstrapError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            BootstrapError::Phase { .. } => "bootstrap_phase_failed",
            BootstrapError::Interrupted => "bootstrap_interrupted",
        }
    }
}
