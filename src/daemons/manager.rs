//! # Daemon manager collaborator.
//!
//! [`DaemonManager`] is the black box that starts named system units. The
//! orchestrator calls it sequentially from several daemons; implementations
//! need no internal locking beyond being shareable.
//!
//! [`SystemctlManager`] is the default implementation: it shells out to
//! `systemctl start <unit>` and reports a non-zero exit as
//! [`DaemonError::UnitStart`].

use std::{ffi::OsString, sync::Arc};

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::DaemonError;

/// Starts/enables named system services.
#[async_trait]
pub trait DaemonManager: Send + Sync + 'static {
    /// Starts the unit `name`, returning once the manager accepted the request.
    async fn start_daemon(&self, name: &str) -> Result<(), DaemonError>;
}

/// Shared handle to a daemon manager.
pub type DaemonManagerRef = Arc<dyn DaemonManager>;

/// [`DaemonManager`] backed by the `systemctl` binary.
#[derive(Clone, Debug)]
pub struct SystemctlManager {
    program: OsString,
}

impl Default for SystemctlManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemctlManager {
    /// Uses `systemctl` from `PATH`.
    pub fn new() -> Self {
        Self::with_program("systemctl")
    }

    /// Uses a different executable with the same `start <unit>` interface.
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl DaemonManager for SystemctlManager {
    async fn start_daemon(&self, name: &str) -> Result<(), DaemonError> {
        let output = Command::new(&self.program)
            .arg("start")
            .arg(name)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| DaemonError::UnitStart {
                unit: name.to_string(),
                reason: e.to_string(),
            })?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(DaemonError::UnitStart {
            unit: name.to_string(),
            reason: format!("{}: {}", output.status, stderr.trim()),
        })
    }
}
