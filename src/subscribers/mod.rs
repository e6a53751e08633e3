//! # Event subscribers for the bootstrap agent.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and
//! built-in implementations for handling events broadcast through the
//! [`Bus`](crate::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   ConditionWaiter / Orchestrator ── publish(Event) ──► Bus ──► agent listener
//!                                                                     │
//!                                                            SubscriberSet::emit
//!                                                          ┌──────────┼──────────┐
//!                                                          ▼          ▼          ▼
//!                                                      LogWriter   Metrics    Custom
//! ```

mod embedded;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use set::SubscriberSet;
pub(crate) use set::report_join_error;
pub use subscribe::Subscribe;
