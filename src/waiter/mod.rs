//! # Condition waiter.
//!
//! Polls a remote [`Describe`] API with exponential backoff until a
//! [`Condition`] over the response holds, the time budget runs out, or the
//! caller cancels.
//!
//! - [`Describe`] one remote call per poll
//! - [`Condition`] predicate over a successful response (closures work)
//! - [`WaiterOptions`] delays, jitter, classifier, attempt logging
//! - [`ConditionWaiter`] the poll-with-backoff state machine

mod api;
mod condition;
mod options;
#[allow(clippy::module_inception)]
mod waiter;

pub use api::Describe;
pub use condition::Condition;
pub use options::{DEFAULT_MAX_DELAY, DEFAULT_MIN_DELAY, WaiterOptions};
pub use waiter::ConditionWaiter;
