//! # Managed daemon abstraction.
//!
//! A [`Daemon`] is a capability object for one externally managed system
//! service. It holds no mutable state of its own, only a handle to the shared
//! [`DaemonManager`](crate::DaemonManager) and the paths it writes to.
//!
//! The orchestrator drives every daemon through the same three [`Phase`]s and
//! never calls anything else on it besides [`Daemon::name`].
//!
//! # Example
//! ```
//! use async_trait::async_trait;
//! use nodevisor::{Daemon, DaemonError, NodeConfig};
//!
//! struct Chrony;
//!
//! #[async_trait]
//! impl Daemon for Chrony {
//!     fn name(&self) -> &str { "chronyd" }
//!
//!     async fn configure(&self, _cfg: &NodeConfig) -> Result<(), DaemonError> { Ok(()) }
//!     async fn ensure_running(&self, _cfg: &NodeConfig) -> Result<(), DaemonError> { Ok(()) }
//!     async fn post_launch(&self, _cfg: &NodeConfig) -> Result<(), DaemonError> { Ok(()) }
//! }
//! ```

use std::{fmt, sync::Arc};

use async_trait::async_trait;

use crate::{error::DaemonError, node::NodeConfig};

/// Lifecycle phase of a managed daemon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Compute and persist the daemon's configuration.
    Configure,
    /// Start/enable the daemon's units.
    EnsureRunning,
    /// Finalization after the daemon is started.
    PostLaunch,
}

impl Phase {
    /// All phases in execution order.
    pub const ORDER: [Phase; 3] = [Phase::Configure, Phase::EnsureRunning, Phase::PostLaunch];

    /// Returns a short stable name (kebab-case) for logs/events.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Configure => "configure",
            Phase::EnsureRunning => "ensure-running",
            Phase::PostLaunch => "post-launch",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// # Externally managed system service.
///
/// Implementations must keep [`Daemon::configure`] idempotent: running it
/// twice with the same [`NodeConfig`] leaves byte-identical files on disk.
#[async_trait]
pub trait Daemon: Send + Sync + 'static {
    /// Stable daemon name, used in diagnostics.
    fn name(&self) -> &str;

    /// Writes this daemon's slice of the configuration.
    async fn configure(&self, cfg: &NodeConfig) -> Result<(), DaemonError>;

    /// Starts the daemon's primary unit and any gate-implied auxiliary units.
    async fn ensure_running(&self, cfg: &NodeConfig) -> Result<(), DaemonError>;

    /// Runs after the daemon has been started; may be a no-op.
    async fn post_launch(&self, cfg: &NodeConfig) -> Result<(), DaemonError>;
}

/// Shared handle to a daemon.
pub type DaemonRef = Arc<dyn Daemon>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order_and_names() {
        let names: Vec<_> = Phase::ORDER.iter().map(Phase::as_str).collect();
        assert_eq!(names, vec!["configure", "ensure-running", "post-launch"]);
        assert!(Phase::Configure < Phase::PostLaunch);
        assert_eq!(Phase::EnsureRunning.to_string(), "ensure-running");
    }
}
