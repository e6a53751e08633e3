//! # nodevisor
//!
//! **Nodevisor** is a node-bootstrap agent library. It brings a freshly
//! launched instance into cluster membership: it composes daemon
//! configuration, starts the daemons in a fixed order and waits for remote
//! resources to reach the state it needs.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                 ┌───────────────────────────────────┐
//!                 │ NodeConfig                        │
//!                 │  featureGates / containerd / ...  │
//!                 └──────────────┬────────────────────┘
//!                                ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Agent                                                            │
//! │  - Bus (broadcast events)                                         │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! │  - Config (bus capacity, waiter defaults, paths)                  │
//! └──────┬─────────────────────────────────────────────────┬──────────┘
//!        ▼                                                 ▼
//! ┌──────────────────────────────┐             ┌───────────────────────┐
//! │ Orchestrator                 │             │ ConditionWaiter       │
//! │  Configure ─► EnsureRunning  │             │  Describe ─► classify │
//! │            ─► PostLaunch     │             │  ─► backoff ─► sleep  │
//! └──────┬───────────────────────┘             └──────────┬────────────┘
//!        ▼                                                │
//!   Daemon (containerd, kubelet, ...)                     │
//!    ├─ compose::merge(fragments) ─► files on disk        │
//!    └─ DaemonManager::start_daemon(unit)                 │
//!        │                                                │
//!        │ PhaseStarting / PhaseFailed / ...              │ WaitRetryableError /
//!        ▼                                                ▼ BackoffScheduled / ...
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                            SubscriberSet
//!                        ┌─────────┼─────────┐
//!                        ▼         ▼         ▼
//!                     LogWriter  worker2   workerN
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                           |
//! |-------------------|--------------------------------------------------------------|----------------------------------------------|
//! | **Waiting**       | Poll a remote API with backoff until a condition holds.      | [`ConditionWaiter`], [`Describe`], [`Condition`] |
//! | **Policies**      | Backoff, jitter and retry classification.                    | [`BackoffPolicy`], [`RetryClassifier`]       |
//! | **Composition**   | Merge configuration fragments deterministically.             | [`Fragment`], [`merge`], [`merge_json`]      |
//! | **Daemons**       | Three-phase managed services selected by feature gates.      | [`Daemon`], [`Orchestrator`], [`FeatureGates`] |
//! | **Subscriber API**| Hook into wait and phase events.                             | [`Subscribe`]                                |
//! | **Errors**        | Typed errors with stable labels.                             | [`WaitError`], [`BootstrapError`]            |
//! | **Configuration** | Centralize runtime settings.                                 | [`Config`]                                   |
//!
//! ## Optional features
//! - `logging`: exports [`LogWriter`], which forwards events to `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use nodevisor::{AgentBuilder, Config, NodeConfig, Paths, SystemctlManager};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dir = tempfile::tempdir()?;
//!     let cfg = Config {
//!         paths: Paths::default().under(dir.path()),
//!         ..Config::default()
//!     };
//!     let agent = AgentBuilder::new(cfg).build();
//!
//!     let node: NodeConfig = serde_json::from_str(
//!         r#"{ "spec": { "featureGates": { "fast-image-pull": true } } }"#,
//!     )?;
//!
//!     // Skip starting units; only render configuration.
//!     let orch = agent
//!         .standard_orchestrator(Arc::new(SystemctlManager::new()))
//!         .skip(nodevisor::Phase::EnsureRunning)
//!         .skip(nodevisor::Phase::PostLaunch)
//!         .build(node.feature_gates());
//!     agent.bootstrap(&node, &orch).await?;
//!
//!     let rendered = std::fs::read_to_string(&agent.config().paths.containerd_config)?;
//!     assert!(rendered.contains("snapshotter = \"soci\""));
//!
//!     agent.shutdown().await;
//!     Ok(())
//! }
//! ```
mod compose;
mod core;
mod daemons;
mod error;
mod events;
mod node;
mod policies;
mod subscribers;
mod waiter;

// ---- Public re-exports ----

pub use compose::{Document, Fragment, FragmentSource, JsonDocument, merge, merge_json};
pub use core::{Agent, AgentBuilder, Config, Orchestrator, OrchestratorBuilder};
pub use daemons::{
    CONTAINERD_DAEMON_NAME, ContainerdDaemon, Daemon, DaemonManager, DaemonManagerRef, DaemonRef,
    KUBELET_DAEMON_NAME, KubeletDaemon, Paths, Phase, SOCI_SNAPSHOTTER_SOCKET_NAME,
    SystemctlManager, base_runtime_spec, containerd_config, kubelet_config, kubelet_env,
};
pub use error::{
    ApiError, ApiErrorKind, BootstrapError, ComposeError, ConditionError, DaemonError, WaitError,
};
pub use events::{Bus, Event, EventKind};
pub use node::{
    ClusterDetails, ContainerdOptions, FAST_IMAGE_PULL, FeatureGates, KubeletOptions, NodeConfig,
    NodeConfigSpec,
};
pub use policies::{
    BackoffPolicy, EVENTUALLY_CONSISTENT_CODES, JitterPolicy, RETRYABLE_STATUSES,
    RetryClassifier, Retryability, THROTTLE_CODES, TRANSIENT_CODES,
};
pub use subscribers::{Subscribe, SubscriberSet};
pub use waiter::{
    Condition, ConditionWaiter, DEFAULT_MAX_DELAY, DEFAULT_MIN_DELAY, Describe, WaiterOptions,
};

// Optional: forward events to `tracing`.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
