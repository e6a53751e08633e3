//! # Global agent configuration.
//!
//! Provides [`Config`] centralized settings for the bootstrap agent.
//!
//! Config is used in two ways:
//! 1. **Agent creation**: `AgentBuilder::new(config)`
//! 2. **Waiter defaults**: `Agent::waiter(api)` hands `config.wait` to the waiter
//!
//! ## Sentinel values
//! - `wait.max_delay = 0s` → default cap (`120s`)
//! - `bus_capacity = 0` → clamped to 1 by the bus

use crate::{daemons::Paths, waiter::WaiterOptions};

/// Global configuration for the bootstrap agent.
///
/// ## Field semantics
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `wait`: Default condition waiter options (can be overridden per call)
/// - `paths`: Files written by the built-in daemons
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items. Minimum value is 1 (enforced by Bus).
    pub bus_capacity: usize,

    /// Default options for [`ConditionWaiter`](crate::ConditionWaiter)s built by the agent.
    pub wait: WaiterOptions,

    /// On-disk locations for daemon configuration.
    ///
    /// Use [`Paths::under`] to write below a different root.
    pub paths: Paths,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `wait = WaiterOptions::default()` (15s / 120s, full jitter)
    /// - `paths = Paths::default()` (system locations under `/etc`)
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            wait: WaiterOptions::default(),
            paths: Paths::default(),
        }
    }
}
