//! # Managed daemons.
//!
//! - [`Daemon`] the three-phase capability the orchestrator drives
//! - [`DaemonManager`] starts named system units ([`SystemctlManager`])
//! - [`ContainerdDaemon`] container runtime, gated lazy-pull snapshotter
//! - [`KubeletDaemon`] node agent
//! - [`Paths`] every file the daemons write

mod containerd;
mod daemon;
mod kubelet;
mod manager;
mod paths;

#[cfg(test)]
pub(crate) mod testing;

pub use containerd::{
    CONTAINERD_DAEMON_NAME, ContainerdDaemon, SOCI_SNAPSHOTTER_SOCKET_NAME, base_runtime_spec,
    containerd_config,
};
pub use daemon::{Daemon, DaemonRef, Phase};
pub use kubelet::{KUBELET_DAEMON_NAME, KubeletDaemon, kubelet_config, kubelet_env};
pub use manager::{DaemonManager, DaemonManagerRef, SystemctlManager};
pub use paths::Paths;
