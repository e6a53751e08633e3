//! # Orchestrator: drives the selected daemons through their phases.
//!
//! ```text
//! OrchestratorBuilder
//!   .with_daemon(containerd)
//!   .with_gated_daemon("feature", extra)     selected only if the gate is on
//!   .skip(Phase::PostLaunch)                 optional
//!   .build(&gates) ──► Orchestrator { daemons: [containerd, ...] }
//!
//! run(cfg):
//!   for phase in [Configure, EnsureRunning, PostLaunch]:
//!     skipped?  → PhaseSkipped
//!     for daemon in declared order:
//!       PhaseStarting → daemon.<phase>(cfg) → PhaseCompleted
//!                                          └► PhaseFailed → abort
//!   BootstrapCompleted
//! ```
//!
//! ## Rules
//! - A phase runs for every daemon before the next phase starts.
//! - Daemons run strictly sequentially in the declared order.
//! - The first failure aborts the run; files already written stay on disk.

use std::{collections::BTreeSet, time::Instant};

use crate::{
    daemons::{DaemonRef, Phase},
    error::{BootstrapError, DaemonError},
    events::{Bus, Event, EventKind},
    node::{FeatureGates, NodeConfig},
};

struct Entry {
    daemon: DaemonRef,
    gate: Option<String>,
}

/// Declares the daemon set of an [`Orchestrator`].
pub struct OrchestratorBuilder {
    bus: Bus,
    entries: Vec<Entry>,
    skipped: BTreeSet<Phase>,
}

impl OrchestratorBuilder {
    /// Creates an empty builder publishing to `bus`.
    pub fn new(bus: Bus) -> Self {
        Self {
            bus,
            entries: Vec::new(),
            skipped: BTreeSet::new(),
        }
    }

    /// Appends a daemon that always runs.
    #[must_use]
    pub fn with_daemon(mut self, daemon: DaemonRef) -> Self {
        self.entries.push(Entry { daemon, gate: None });
        self
    }

    /// Appends a daemon that runs only when `feature` is enabled.
    #[must_use]
    pub fn with_gated_daemon(mut self, feature: impl Into<String>, daemon: DaemonRef) -> Self {
        self.entries.push(Entry {
            daemon,
            gate: Some(feature.into()),
        });
        self
    }

    /// Skips `phase` for every daemon.
    #[must_use]
    pub fn skip(mut self, phase: Phase) -> Self {
        self.skipped.insert(phase);
        self
    }

    /// Selects the daemons enabled by `gates`, keeping declaration order.
    pub fn build(self, gates: &FeatureGates) -> Orchestrator {
        let daemons = self
            .entries
            .into_iter()
            .filter(|e| e.gate.as_deref().is_none_or(|g| gates.is_enabled(g)))
            .map(|e| e.daemon)
            .collect();
        Orchestrator {
            bus: self.bus,
            daemons,
            skipped: self.skipped,
        }
    }
}

/// Ordered set of daemons selected for one bootstrap run.
pub struct Orchestrator {
    bus: Bus,
    daemons: Vec<DaemonRef>,
    skipped: BTreeSet<Phase>,
}

impl Orchestrator {
    /// Starts a builder publishing to `bus`.
    pub fn builder(bus: Bus) -> OrchestratorBuilder {
        OrchestratorBuilder::new(bus)
    }

    /// Names of the selected daemons, in run order.
    pub fn daemon_names(&self) -> Vec<&str> {
        self.daemons.iter().map(|d| d.name()).collect()
    }

    /// Runs every non-skipped phase for every selected daemon.
    ///
    /// # Errors
    /// [`BootstrapError::Phase`] naming the first daemon and phase that failed.
    pub async fn run(&self, cfg: &NodeConfig) -> Result<(), BootstrapError> {
        for phase in Phase::ORDER {
            if self.skipped.contains(&phase) {
                self.bus
                    .publish(Event::new(EventKind::PhaseSkipped).with_phase(phase));
                continue;
            }
            for daemon in &self.daemons {
                self.run_phase(daemon, phase, cfg).await?;
            }
        }
        self.bus.publish(Event::new(EventKind::BootstrapCompleted));
        Ok(())
    }

    async fn run_phase(
        &self,
        daemon: &DaemonRef,
        phase: Phase,
        cfg: &NodeConfig,
    ) -> Result<(), BootstrapError> {
        let name = daemon.name();
        self.bus.publish(
            Event::new(EventKind::PhaseStarting)
                .with_daemon(name)
                .with_phase(phase),
        );

        let started = Instant::now();
        let res: Result<(), DaemonError> = match phase {
            Phase::Configure => daemon.configure(cfg).await,
            Phase::EnsureRunning => daemon.ensure_running(cfg).await,
            Phase::PostLaunch => daemon.post_launch(cfg).await,
        };

        match res {
            Ok(()) => {
                self.bus.publish(
                    Event::new(EventKind::PhaseCompleted)
                        .with_daemon(name)
                        .with_phase(phase)
                        .with_elapsed(started.elapsed()),
                );
                Ok(())
            }
            Err(source) => {
                self.bus.publish(
                    Event::new(EventKind::PhaseFailed)
                        .with_daemon(name)
                        .with_phase(phase)
                        .with_label(source.as_label())
                        .with_reason(source.to_string()),
                );
                Err(BootstrapError::Phase {
                    daemon: name.to_string(),
                    phase,
                    source,
                })
            }
        }
    }
}
