use std::sync::Arc;

use super::{agent::Agent, config::Config};
use crate::{
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing an [`Agent`].
pub struct AgentBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl AgentBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (wait progress, daemon phases)
    /// through dedicated workers with bounded queues.
    #[must_use]
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the agent: bus, subscriber workers and the bus listener.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Agent {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        Agent::new_internal(self.cfg, bus, subs)
    }
}
