//! # Runtime events emitted by the waiter, the orchestrator and subscribers.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Wait events**: poll attempts, retryable errors, backoff, final outcome
//! - **Phase events**: daemon phase start/completion/failure/skip
//! - **Runtime events**: bootstrap completion, shutdown requests
//! - **Subscriber events**: panics and overflow inside subscriber workers
//!
//! The [`Event`] struct carries additional metadata such as timestamps, daemon
//! name, phase, attempt numbers and backoff delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use nodevisor::{Event, EventKind, Phase};
//!
//! let ev = Event::new(EventKind::PhaseFailed)
//!     .with_daemon("containerd")
//!     .with_phase(Phase::EnsureRunning)
//!     .with_reason("exit status 1");
//!
//! assert_eq!(ev.kind, EventKind::PhaseFailed);
//! assert_eq!(ev.daemon.as_deref(), Some("containerd"));
//! assert_eq!(ev.reason.as_deref(), Some("exit status 1"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::daemons::Phase;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `daemon`: subscriber name
    /// - `reason`: panic message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `daemon`: subscriber name
    /// - `reason`: `full` or `closed`
    SubscriberOverflow,

    // === Runtime events ===
    /// Termination signal observed while bootstrapping.
    ShutdownRequested,

    /// Every selected daemon went through every non-skipped phase.
    BootstrapCompleted,

    // === Wait events ===
    /// A poll is about to be issued (only with `log_wait_attempts`).
    ///
    /// Sets:
    /// - `attempt`: attempt number (1-based)
    WaitAttemptStarting,

    /// The API call failed with a retryable or timeout error.
    ///
    /// Sets:
    /// - `attempt`: attempt number
    /// - `label`: `retryable` or `timeout`
    /// - `reason`: error message
    WaitRetryableError,

    /// The API call succeeded but the condition is not met yet.
    ///
    /// Sets:
    /// - `attempt`: attempt number
    WaitConditionPending,

    /// Next poll scheduled.
    ///
    /// Sets:
    /// - `attempt`: attempt that just finished
    /// - `delay_ms`: delay before the next poll
    /// - `elapsed_ms`: time spent since the wait started
    BackoffScheduled,

    /// The condition was met.
    ///
    /// Sets:
    /// - `attempt`: attempt that satisfied the condition
    /// - `elapsed_ms`: total wait time
    WaitSucceeded,

    /// The wait ended without success.
    ///
    /// Sets:
    /// - `attempt`: number of attempts issued
    /// - `label`: [`WaitError::as_label`](crate::WaitError::as_label)
    /// - `reason`: error message
    WaitFailed,

    // === Phase events ===
    /// A daemon phase is starting.
    ///
    /// Sets:
    /// - `daemon`: daemon name
    /// - `phase`: phase
    PhaseStarting,

    /// A daemon phase completed.
    ///
    /// Sets:
    /// - `daemon`: daemon name
    /// - `phase`: phase
    /// - `elapsed_ms`: phase duration
    PhaseCompleted,

    /// A daemon phase failed; the run aborts.
    ///
    /// Sets:
    /// - `daemon`: daemon name
    /// - `phase`: phase
    /// - `label`: [`DaemonError::as_label`](crate::DaemonError::as_label)
    /// - `reason`: error message
    PhaseFailed,

    /// A phase was skipped for every daemon.
    ///
    /// Sets:
    /// - `phase`: phase
    PhaseSkipped,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Daemon (or subscriber) name, if applicable.
    pub daemon: Option<Arc<str>>,
    /// Lifecycle phase, if applicable.
    pub phase: Option<Phase>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Backoff delay before next poll in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Elapsed time in milliseconds (compact).
    pub elapsed_ms: Option<u32>,
    /// Stable label of an error or error class.
    pub label: Option<&'static str>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            daemon: None,
            phase: None,
            attempt: None,
            delay_ms: None,
            elapsed_ms: None,
            label: None,
            reason: None,
        }
    }

    /// Attaches a daemon name.
    #[inline]
    pub fn with_daemon(mut self, daemon: impl Into<Arc<str>>) -> Self {
        self.daemon = Some(daemon.into());
        self
    }

    /// Attaches a phase.
    #[inline]
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a backoff delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(compact_ms(d));
        self
    }

    /// Attaches an elapsed time (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        self.elapsed_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a stable label.
    #[inline]
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_daemon(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_daemon(subscriber)
            .with_reason(info)
    }
}

fn compact_ms(d: Duration) -> u32 {
    u32::try_from(d.as_millis()).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::PhaseStarting);
        let b = Event::new(EventKind::PhaseCompleted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_durations_are_compacted() {
        let ev = Event::new(EventKind::BackoffScheduled)
            .with_delay(Duration::from_secs(15))
            .with_elapsed(Duration::from_secs(u64::MAX / 2));
        assert_eq!(ev.delay_ms, Some(15_000));
        assert_eq!(ev.elapsed_ms, Some(u32::MAX));
    }
}
