//! Runtime core: orchestration and agent lifecycle.
//!
//! Internal modules:
//! - [`orchestrator`]: drives the selected daemons through their phases;
//! - [`agent`]: owns the bus and subscribers, races bootstrap against signals;
//! - [`builder`]: assembles an [`Agent`] from [`Config`] and subscribers;
//! - [`config`]: global settings;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod agent;
mod builder;
mod config;
mod orchestrator;
mod shutdown;

pub use agent::Agent;
pub use builder::AgentBuilder;
pub use config::Config;
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
