//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the condition waiter, the
//! orchestrator and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `ConditionWaiter`, `Orchestrator`, `Agent`,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the `Agent` listener (fans out to `SubscriberSet`), or any
//!   caller holding a receiver from [`Bus::subscribe`].

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
