//! # LogWriter: events to `tracing`
//!
//! A subscriber that turns incoming [`Event`]s into structured `tracing` records.
//! Install any `tracing` subscriber in the binary to see them.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  phase starting daemon="containerd" phase=configure
//! INFO  phase completed daemon="containerd" phase=configure elapsed_ms=3
//! WARN  retryable api error attempt=1 class="retryable" err="api error code=Throttling: slow down"
//! INFO  backoff scheduled after_attempt=1 delay_ms=15000
//! ERROR phase failed daemon="containerd" phase=ensure-running err="starting unit ..."
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;
use async_trait::async_trait;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let daemon = e.daemon.as_deref().unwrap_or("-");
        let phase = e.phase.map(|p| p.as_str()).unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::ShutdownRequested => {
                tracing::warn!("shutdown requested");
            }
            EventKind::BootstrapCompleted => {
                tracing::info!("bootstrap completed");
            }
            EventKind::WaitAttemptStarting => {
                tracing::info!(attempt = ?e.attempt, "attempting waiter request");
            }
            EventKind::WaitRetryableError => {
                tracing::warn!(attempt = ?e.attempt, class = ?e.label, err = reason, "retryable api error");
            }
            EventKind::WaitConditionPending => {
                tracing::debug!(attempt = ?e.attempt, "condition not met yet");
            }
            EventKind::BackoffScheduled => {
                tracing::info!(after_attempt = ?e.attempt, delay_ms = ?e.delay_ms, elapsed_ms = ?e.elapsed_ms, "backoff scheduled");
            }
            EventKind::WaitSucceeded => {
                tracing::info!(attempt = ?e.attempt, elapsed_ms = ?e.elapsed_ms, "wait succeeded");
            }
            EventKind::WaitFailed => {
                tracing::error!(attempts = ?e.attempt, label = ?e.label, err = reason, "wait failed");
            }
            EventKind::PhaseStarting => {
                tracing::info!(daemon, phase, "phase starting");
            }
            EventKind::PhaseCompleted => {
                tracing::info!(daemon, phase, elapsed_ms = ?e.elapsed_ms, "phase completed");
            }
            EventKind::PhaseFailed => {
                tracing::error!(daemon, phase, label = ?e.label, err = reason, "phase failed");
            }
            EventKind::PhaseSkipped => {
                tracing::info!(phase, "phase skipped");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(subscriber = daemon, reason, "subscriber dropped event");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(subscriber = daemon, info = reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
