//! # Node configuration.
//!
//! [`NodeConfig`] is the root input of one bootstrap run. It is produced once
//! by an external loader (any serde format) and only read afterwards.
//!
//! ```text
//! NodeConfig
//!   └─ spec
//!       ├─ featureGates  { "fast-image-pull": true, ... }
//!       ├─ cluster       { name, apiServerEndpoint, clusterDns }
//!       ├─ containerd    { config (inline TOML), baseRuntimeSpec (JSON object) }
//!       └─ kubelet       { config (JSON object), flags }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::gates::FeatureGates;

/// Root configuration for one bootstrap run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    /// Desired node state.
    #[serde(default)]
    pub spec: NodeConfigSpec,
}

impl NodeConfig {
    /// Shorthand for `spec.feature_gates`.
    pub fn feature_gates(&self) -> &FeatureGates {
        &self.spec.feature_gates
    }
}

/// Nested specification blocks consumed by the daemons.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfigSpec {
    /// Feature toggles; absent features are disabled.
    #[serde(default)]
    pub feature_gates: FeatureGates,
    /// Cluster the node joins.
    #[serde(default)]
    pub cluster: ClusterDetails,
    /// Container runtime options.
    #[serde(default)]
    pub containerd: ContainerdOptions,
    /// Node agent options.
    #[serde(default)]
    pub kubelet: KubeletOptions,
}

/// Cluster membership details.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDetails {
    /// Cluster name.
    #[serde(default)]
    pub name: String,
    /// Control plane endpoint.
    #[serde(default)]
    pub api_server_endpoint: String,
    /// DNS server addresses handed to pods.
    #[serde(default)]
    pub cluster_dns: Vec<String>,
}

/// Container runtime options.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerdOptions {
    /// Inline TOML merged over the generated runtime config (last writer wins).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    /// JSON object merged over the default OCI base runtime spec.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_runtime_spec: Option<Map<String, Value>>,
}

/// Node agent options.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubeletOptions {
    /// JSON object merged over the generated agent config.
    #[serde(default)]
    pub config: Map<String, Value>,
    /// Extra command-line flags, passed through verbatim.
    #[serde(default)]
    pub flags: Vec<String>,
}
