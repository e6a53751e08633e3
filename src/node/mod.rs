//! Node configuration and feature gates.
//!
//! - [`NodeConfig`] root input of one bootstrap run (read-only during orchestration)
//! - [`FeatureGates`] explicit gate set; absent features are disabled

mod config;
mod gates;

pub use config::{ClusterDetails, ContainerdOptions, KubeletOptions, NodeConfig, NodeConfigSpec};
pub use gates::{FAST_IMAGE_PULL, FeatureGates};
