//! # ConditionWaiter: poll-with-backoff until a condition holds.
//!
//! ```text
//! wait(params, max_wait, condition, ctx)
//!   validate (max_wait > 0, min_delay <= max_delay)      → Configuration
//!   deadline = now + max_wait; remaining = max_wait
//!
//!   Polling ──► describe() ──► Err(terminal)            → Failed(Terminal)
//!      ▲             │         Err(retryable | timeout) ─┐
//!      │             ▼                                   │
//!      │        condition(out) ─► Err                   → Failed(Condition)
//!      │             │           Ok(true)               → Succeeded(out)
//!      │             ▼ Ok(false)                         │
//!      │        remaining -= iteration elapsed ◄─────────┘
//!      │        remaining <= min_delay                  → Failed(DeadlineExceeded)
//!      │        delay = backoff(attempt, remaining); remaining -= delay
//!      └──── BackingOff(delay) ─ cancelled / deadline   → Failed(Cancelled)
//! ```
//!
//! ## Rules
//! - One API call per attempt; attempts are strictly sequential.
//! - The in-flight call observes the deadline (→ `DeadlineExceeded`) and the
//!   cancellation token (→ `Cancelled`).
//! - Terminal API errors are returned exactly as the API produced them.

use std::time::Duration;

use tokio::{
    select,
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;

use super::{api::Describe, condition::Condition, options::WaiterOptions};
use crate::{
    error::{ApiError, WaitError},
    events::{Bus, Event, EventKind},
    policies::BackoffPolicy,
};

/// State of one wait.
enum WaitState<O> {
    Polling,
    BackingOff(Duration),
    Succeeded(O),
    Failed(WaitError),
}

/// Bookkeeping carried across states.
struct WaitRun {
    max_wait: Duration,
    started: Instant,
    deadline: Instant,
    remaining: Duration,
    attempt: u32,
    last_error: Option<ApiError>,
}

impl WaitRun {
    fn deadline_exceeded(&mut self) -> WaitError {
        WaitError::DeadlineExceeded {
            max_wait: self.max_wait,
            attempts: self.attempt,
            last_error: self.last_error.take(),
        }
    }
}

/// Polls a [`Describe`] API until a [`Condition`] holds.
///
/// Progress is published on the bus as wait events; see
/// [`EventKind::WaitRetryableError`] and the following variants.
pub struct ConditionWaiter<A: Describe> {
    api: A,
    bus: Bus,
    options: WaiterOptions,
}

impl<A: Describe> ConditionWaiter<A> {
    /// Creates a waiter with default options used by [`wait`](Self::wait).
    pub fn new(api: A, bus: Bus, options: WaiterOptions) -> Self {
        Self { api, bus, options }
    }

    /// Default options of this waiter.
    pub fn options(&self) -> &WaiterOptions {
        &self.options
    }

    /// Waits with the waiter's default options.
    ///
    /// Returns the response that satisfied `condition`.
    ///
    /// # Errors
    /// See [`WaitError`]; retryable API errors never surface directly.
    pub async fn wait<C>(
        &self,
        params: &A::Params,
        max_wait: Duration,
        condition: &C,
        ctx: &CancellationToken,
    ) -> Result<A::Output, WaitError>
    where
        C: Condition<A::Output>,
    {
        self.wait_with_options(params, max_wait, condition, &self.options, ctx)
            .await
    }

    /// Waits with explicit options for this call only.
    ///
    /// # Errors
    /// See [`WaitError`].
    pub async fn wait_with_options<C>(
        &self,
        params: &A::Params,
        max_wait: Duration,
        condition: &C,
        options: &WaiterOptions,
        ctx: &CancellationToken,
    ) -> Result<A::Output, WaitError>
    where
        C: Condition<A::Output>,
    {
        if max_wait.is_zero() {
            return Err(WaitError::configuration(
                "waiter max wait time must be greater than zero",
            ));
        }
        let backoff = options.backoff()?;

        let started = Instant::now();
        let mut run = WaitRun {
            max_wait,
            started,
            deadline: started + max_wait,
            remaining: max_wait,
            attempt: 0,
            last_error: None,
        };

        let mut state = WaitState::Polling;
        loop {
            state = match state {
                WaitState::Polling => {
                    self.poll(&mut run, params, condition, options, &backoff, ctx)
                        .await
                }
                WaitState::BackingOff(delay) => self.back_off(&mut run, delay, ctx).await,
                WaitState::Succeeded(output) => {
                    self.bus.publish(
                        Event::new(EventKind::WaitSucceeded)
                            .with_attempt(run.attempt)
                            .with_elapsed(run.started.elapsed()),
                    );
                    return Ok(output);
                }
                WaitState::Failed(err) => {
                    self.bus.publish(
                        Event::new(EventKind::WaitFailed)
                            .with_attempt(run.attempt)
                            .with_elapsed(run.started.elapsed())
                            .with_label(err.as_label())
                            .with_reason(err.to_string()),
                    );
                    return Err(err);
                }
            };
        }
    }

    /// One attempt: call, classify or evaluate, then budget the next delay.
    async fn poll<C>(
        &self,
        run: &mut WaitRun,
        params: &A::Params,
        condition: &C,
        options: &WaiterOptions,
        backoff: &BackoffPolicy,
        ctx: &CancellationToken,
    ) -> WaitState<A::Output>
    where
        C: Condition<A::Output>,
    {
        if ctx.is_cancelled() {
            return WaitState::Failed(WaitError::Cancelled { during: "polling" });
        }

        run.attempt += 1;
        let attempt = run.attempt;
        let iteration_start = Instant::now();
        if options.log_wait_attempts {
            self.bus
                .publish(Event::new(EventKind::WaitAttemptStarting).with_attempt(attempt));
        }

        let res = select! {
            res = time::timeout_at(run.deadline, self.api.describe(params)) => res,
            _ = ctx.cancelled() => {
                return WaitState::Failed(WaitError::Cancelled { during: "polling" });
            }
        };
        let Ok(res) = res else {
            return WaitState::Failed(run.deadline_exceeded());
        };

        match res {
            Ok(output) => match condition.evaluate(&output) {
                Ok(true) => return WaitState::Succeeded(output),
                Ok(false) => {
                    self.bus
                        .publish(Event::new(EventKind::WaitConditionPending).with_attempt(attempt));
                }
                Err(source) => {
                    return WaitState::Failed(WaitError::Condition { attempt, source });
                }
            },
            Err(err) => {
                let class = options.classifier.classify(&err);
                if !class.is_retryable() {
                    return WaitState::Failed(WaitError::Terminal {
                        attempt,
                        source: err,
                    });
                }
                self.bus.publish(
                    Event::new(EventKind::WaitRetryableError)
                        .with_attempt(attempt)
                        .with_label(class.as_label())
                        .with_reason(err.to_string()),
                );
                run.last_error = Some(err);
            }
        }

        run.remaining = run.remaining.saturating_sub(iteration_start.elapsed());
        if run.remaining <= backoff.min_delay() {
            return WaitState::Failed(run.deadline_exceeded());
        }

        let delay = backoff.compute_delay(attempt, run.remaining);
        run.remaining = run.remaining.saturating_sub(delay);
        WaitState::BackingOff(delay)
    }

    async fn back_off(
        &self,
        run: &mut WaitRun,
        delay: Duration,
        ctx: &CancellationToken,
    ) -> WaitState<A::Output> {
        self.bus.publish(
            Event::new(EventKind::BackoffScheduled)
                .with_attempt(run.attempt)
                .with_delay(delay)
                .with_elapsed(run.started.elapsed()),
        );

        select! {
            biased;
            _ = time::sleep(delay) => WaitState::Polling,
            _ = ctx.cancelled() => WaitState::Failed(WaitError::Cancelled { during: "backing off" }),
            _ = time::sleep_until(run.deadline) => {
                WaitState::Failed(WaitError::Cancelled { during: "backing off" })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{
            Arc, Mutex,
            atomic::{AtomicU32, Ordering},
        },
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{error::ConditionError, policies::JitterPolicy};

    /// Replays a script of responses, then repeats `fallback`.
    struct Scripted {
        calls: AtomicU32,
        latency: Duration,
        script: Mutex<VecDeque<Result<u32, ApiError>>>,
        fallback: Result<u32, ApiError>,
    }

    impl Scripted {
        fn new(script: Vec<Result<u32, ApiError>>, fallback: Result<u32, ApiError>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                latency: Duration::ZERO,
                script: Mutex::new(script.into()),
                fallback,
            })
        }

        fn slow(latency: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                latency,
                script: Mutex::new(VecDeque::new()),
                fallback: Ok(1),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Describe for Scripted {
        type Params = ();
        type Output = u32;

        async fn describe(&self, _params: &()) -> Result<u32, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.latency.is_zero() {
                time::sleep(self.latency).await;
            }
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| self.fallback.clone())
        }
    }

    fn is_one(n: &u32) -> Result<bool, ConditionError> {
        Ok(*n == 1)
    }

    fn throttled() -> ApiError {
        ApiError::service("RequestLimitExceeded", "slow down")
    }

    fn options(min: u64, max: u64) -> WaiterOptions {
        WaiterOptions::default()
            .with_delays(Duration::from_secs(min), Duration::from_secs(max))
            .with_jitter(JitterPolicy::None)
    }

    fn waiter(api: Arc<Scripted>, min: u64, max: u64) -> ConditionWaiter<Arc<Scripted>> {
        ConditionWaiter::new(api, Bus::new(64), options(min, max))
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_max_wait_makes_no_call() {
        let api = Scripted::new(vec![], Ok(1));
        let w = waiter(api.clone(), 1, 10);
        let err = w
            .wait(&(), Duration::ZERO, &is_one, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, WaitError::Configuration { .. }));
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_min_above_max_makes_no_call() {
        let api = Scripted::new(vec![], Ok(1));
        let w = waiter(api.clone(), 30, 10);
        let err = w
            .wait(&(), Duration::from_secs(60), &is_one, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.as_label(), "wait_configuration");
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_returns_response() {
        let api = Scripted::new(vec![], Ok(1));
        let w = waiter(api.clone(), 1, 10);
        let out = w
            .wait(&(), Duration::from_secs(60), &is_one, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out, 1);
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_error_returns_exact_error_after_one_call() {
        let denied = ApiError::service("UnauthorizedOperation", "not allowed");
        let api = Scripted::new(vec![], Err(denied.clone()));
        let w = waiter(api.clone(), 1, 10);
        let err = w
            .wait(&(), Duration::from_secs(60), &is_one, &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            WaitError::Terminal { attempt, source } => {
                assert_eq!(attempt, 1);
                assert_eq!(source, denied);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_errors_then_success() {
        let api = Scripted::new(
            vec![Err(throttled()), Err(ApiError::timeout("read timeout"))],
            Ok(1),
        );
        let w = waiter(api.clone(), 1, 10);
        let start = Instant::now();
        let out = w
            .wait(&(), Duration::from_secs(60), &is_one, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out, 1);
        assert_eq!(api.calls(), 3);
        // 1s after the first attempt, 2s after the second
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_retried_for_eventual_consistency() {
        let api = Scripted::new(
            vec![Err(ApiError::service("InvalidInstanceID.NotFound", "no such id"))],
            Ok(1),
        );
        let w = waiter(api.clone(), 1, 10);
        w.wait(&(), Duration::from_secs(60), &is_one, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhaustion_is_deadline_exceeded() {
        let api = Scripted::new(vec![], Err(throttled()));
        let w = waiter(api.clone(), 1, 2);
        let err = w
            .wait(&(), Duration::from_secs(10), &is_one, &CancellationToken::new())
            .await
            .unwrap_err();
        // delays 1, 2, 2, 2, 2 leave exactly min_delay after the sixth call
        match err {
            WaitError::DeadlineExceeded {
                attempts,
                last_error,
                max_wait,
            } => {
                assert_eq!(attempts, 6);
                assert_eq!(max_wait, Duration::from_secs(10));
                assert_eq!(last_error, Some(throttled()));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(api.calls(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_equal_to_min_delay_stops() {
        let api = Scripted::new(vec![], Ok(0));
        let w = waiter(api.clone(), 5, 10);
        let err = w
            .wait(&(), Duration::from_secs(5), &is_one, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WaitError::DeadlineExceeded { attempts: 1, last_error: None, .. }
        ));
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_during_call_is_deadline_exceeded() {
        let api = Scripted::slow(Duration::from_secs(30));
        let w = waiter(api.clone(), 1, 10);
        let start = Instant::now();
        let err = w
            .wait(&(), Duration::from_secs(2), &is_one, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.as_label(), "wait_deadline_exceeded");
        assert!(start.elapsed() < Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let api = Scripted::new(vec![], Ok(0));
        let w = waiter(api.clone(), 10, 60);
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_secs(5)).await;
            canceller.cancel();
        });

        let err = w
            .wait(&(), Duration::from_secs(600), &is_one, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, WaitError::Cancelled { during: "backing off" }));
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_inflight_call() {
        let api = Scripted::slow(Duration::from_secs(3600));
        let w = waiter(api.clone(), 10, 60);
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_secs(5)).await;
            canceller.cancel();
        });

        let start = Instant::now();
        let err = w
            .wait(&(), Duration::from_secs(600), &is_one, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, WaitError::Cancelled { during: "polling" }));
        assert_eq!(api.calls(), 1);
        assert!(start.elapsed() < Duration::from_secs(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start_makes_no_call() {
        let api = Scripted::new(vec![], Ok(1));
        let w = waiter(api.clone(), 1, 10);
        let token = CancellationToken::new();
        token.cancel();
        let err = w
            .wait(&(), Duration::from_secs(60), &is_one, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, WaitError::Cancelled { during: "polling" }));
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_condition_error_aborts() {
        let api = Scripted::new(vec![], Ok(7));
        let w = waiter(api.clone(), 1, 10);
        let strict = |n: &u32| -> Result<bool, ConditionError> {
            Err(ConditionError::new(format!("unexpected state {n}")))
        };
        let err = w
            .wait(&(), Duration::from_secs(60), &strict, &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            WaitError::Condition { attempt, source } => {
                assert_eq!(attempt, 1);
                assert_eq!(source.reason(), "unexpected state 7");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_follow_state_transitions() {
        let api = Scripted::new(vec![Err(throttled())], Ok(1));
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let w = ConditionWaiter::new(api, bus, options(1, 10).with_attempt_logging(true));

        w.wait(&(), Duration::from_secs(60), &is_one, &CancellationToken::new())
            .await
            .unwrap();

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        assert_eq!(
            kinds,
            vec![
                EventKind::WaitAttemptStarting,
                EventKind::WaitRetryableError,
                EventKind::BackoffScheduled,
                EventKind::WaitAttemptStarting,
                EventKind::WaitSucceeded,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_call_options_override_defaults() {
        let api = Scripted::new(vec![Ok(0)], Ok(1));
        let w = waiter(api.clone(), 30, 60);
        let start = Instant::now();
        w.wait_with_options(
            &(),
            Duration::from_secs(60),
            &is_one,
            &options(1, 2),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(api.calls(), 2);
        assert!(start.elapsed() < Duration::from_secs(30));
    }
}
