//! Test doubles shared by daemon and orchestrator tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::manager::{DaemonManager, DaemonManagerRef};
use crate::error::DaemonError;

/// Records every start request; optionally fails one unit.
#[derive(Default)]
pub(crate) struct RecordingManager {
    fail_on: Option<String>,
    attempted: Mutex<Vec<String>>,
    started: Mutex<Vec<String>>,
}

impl RecordingManager {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn arc() -> DaemonManagerRef {
        Self::new()
    }

    pub(crate) fn failing_on(unit: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_on: Some(unit.to_string()),
            ..Self::default()
        })
    }

    pub(crate) fn attempted(&self) -> Vec<String> {
        self.attempted.lock().unwrap().clone()
    }

    pub(crate) fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl DaemonManager for RecordingManager {
    async fn start_daemon(&self, name: &str) -> Result<(), DaemonError> {
        self.attempted.lock().unwrap().push(name.to_string());
        if self.fail_on.as_deref() == Some(name) {
            return Err(DaemonError::UnitStart {
                unit: name.to_string(),
                reason: "exit status: 1".to_string(),
            });
        }
        self.started.lock().unwrap().push(name.to_string());
        Ok(())
    }
}
