//! # Agent: owns the event plumbing around one bootstrap.
//!
//! The [`Agent`] owns the [`Bus`], a [`SubscriberSet`] and the global
//! [`Config`]. Everything it hands out (orchestrators, waiters) publishes on
//! the same bus.
//!
//! ## High-level architecture
//! ```text
//! AgentBuilder::new(cfg).with_subscribers(subs).build()
//!   └─► listener: Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!
//! agent.orchestrator() / agent.standard_orchestrator(mgr)
//!   └─► OrchestratorBuilder (bus wired) ─► build(&gates) ─► Orchestrator
//!
//! agent.bootstrap(&cfg, &orch)
//!   ├─► orch.run(&cfg)                        → Ok / BootstrapError::Phase
//!   └─► shutdown::wait_for_shutdown_signal()  (or bootstrap_until's future)
//!             └─► Bus.publish(ShutdownRequested) → BootstrapError::Interrupted
//!
//! agent.waiter(api) ─► ConditionWaiter (cfg.wait defaults)
//!
//! agent.shutdown()
//!   └─► stop listener → drain bus → SubscriberSet::shutdown (join workers)
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use nodevisor::{AgentBuilder, Config, NodeConfig, Subscribe};
//! #[cfg(feature = "logging")]
//! use nodevisor::LogWriter;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut subs: Vec<Arc<dyn Subscribe>> = Vec::new();
//!     #[cfg(feature = "logging")]
//!     subs.push(Arc::new(LogWriter::new()));
//!
//!     let agent = AgentBuilder::new(Config::default())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     let cfg = NodeConfig::default();
//!     let orch = agent.orchestrator().build(cfg.feature_gates());
//!     agent.bootstrap(&cfg, &orch).await?;
//!
//!     agent.shutdown().await;
//!     Ok(())
//! }
//! ```

use tokio::{
    select,
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use super::{
    config::Config,
    orchestrator::{Orchestrator, OrchestratorBuilder},
    shutdown,
};
use crate::{
    daemons::{ContainerdDaemon, DaemonManagerRef, KubeletDaemon},
    error::BootstrapError,
    events::{Bus, Event, EventKind},
    node::NodeConfig,
    subscribers::{SubscriberSet, report_join_error},
    waiter::{ConditionWaiter, Describe},
};

/// Bootstrap agent: event bus, subscribers and factories for the core parts.
pub struct Agent {
    cfg: Config,
    bus: Bus,
    listener: JoinHandle<()>,
    stop: CancellationToken,
}

impl Agent {
    pub(super) fn new_internal(cfg: Config, bus: Bus, subs: SubscriberSet) -> Self {
        let stop = CancellationToken::new();
        let rx = bus.subscribe();
        let listener = tokio::spawn(subscriber_listener(rx, subs, stop.clone()));
        Self {
            cfg,
            bus,
            listener,
            stop,
        }
    }

    /// Global configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Event bus shared by everything this agent builds.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Empty orchestrator builder publishing on the agent bus.
    pub fn orchestrator(&self) -> OrchestratorBuilder {
        Orchestrator::builder(self.bus.clone())
    }

    /// Orchestrator builder with the built-in daemons, in run order:
    /// container runtime first, then the node agent.
    pub fn standard_orchestrator(&self, manager: DaemonManagerRef) -> OrchestratorBuilder {
        self.orchestrator()
            .with_daemon(ContainerdDaemon::arc(manager.clone(), self.cfg.paths.clone()))
            .with_daemon(KubeletDaemon::arc(manager, self.cfg.paths.clone()))
    }

    /// Condition waiter over `api` using `cfg.wait` as default options.
    pub fn waiter<A: Describe>(&self, api: A) -> ConditionWaiter<A> {
        ConditionWaiter::new(api, self.bus.clone(), self.cfg.wait.clone())
    }

    /// Runs `orch` against `cfg` until it completes or a termination signal arrives.
    ///
    /// # Errors
    /// - [`BootstrapError::Phase`] from the orchestrator
    /// - [`BootstrapError::Interrupted`] on SIGINT/SIGTERM/SIGQUIT
    pub async fn bootstrap(
        &self,
        cfg: &NodeConfig,
        orch: &Orchestrator,
    ) -> Result<(), BootstrapError> {
        self.bootstrap_until(cfg, orch, signal_or_pending()).await
    }

    /// Runs `orch` against `cfg` until it completes or `interrupt` resolves.
    ///
    /// The orchestrator is dropped mid-phase when `interrupt` wins.
    ///
    /// # Errors
    /// - [`BootstrapError::Phase`] from the orchestrator
    /// - [`BootstrapError::Interrupted`] once `interrupt` completes
    pub async fn bootstrap_until<F>(
        &self,
        cfg: &NodeConfig,
        orch: &Orchestrator,
        interrupt: F,
    ) -> Result<(), BootstrapError>
    where
        F: Future<Output = ()>,
    {
        select! {
            res = orch.run(cfg) => res,
            () = interrupt => {
                self.bus.publish(Event::new(EventKind::ShutdownRequested));
                Err(BootstrapError::Interrupted)
            }
        }
    }

    /// Delivers every event published so far, then stops all subscriber workers.
    ///
    /// A crashed listener is reported on the bus as `SubscriberPanicked`.
    pub async fn shutdown(self) {
        self.stop.cancel();
        report_join_error(&self.bus, "agent-listener", self.listener.await);
    }
}

/// Completes on a termination signal; never completes if signals are unavailable.
async fn signal_or_pending() {
    if shutdown::wait_for_shutdown_signal().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Forwards bus events to the subscriber set until `stop`, then drains and joins.
async fn subscriber_listener(
    mut rx: broadcast::Receiver<Event>,
    subs: SubscriberSet,
    stop: CancellationToken,
) {
    loop {
        select! {
            biased;
            res = rx.recv() => match res {
                Ok(ev) => subs.emit(&ev),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            },
            _ = stop.cancelled() => break,
        }
    }
    while let Ok(ev) = rx.try_recv() {
        subs.emit(&ev);
    }
    subs.shutdown().await;
}
