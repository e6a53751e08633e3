//! # Node agent daemon.
//!
//! Configure writes the kubelet config (base ⊕ cluster ⊕ user JSON) and the
//! environment file read by the unit. EnsureRunning starts `kubelet`.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::{
    daemon::{Daemon, DaemonRef},
    manager::DaemonManagerRef,
    paths::{Paths, write_file},
};
use crate::{
    compose::{Fragment, JsonDocument, merge_json},
    error::{ComposeError, DaemonError},
    node::NodeConfig,
};

/// Unit name of the node agent.
pub const KUBELET_DAEMON_NAME: &str = "kubelet";

fn base_config() -> Map<String, Value> {
    let base = json!({
        "kind": "KubeletConfiguration",
        "apiVersion": "kubelet.config.k8s.io/v1beta1",
        "address": "0.0.0.0",
        "authentication": {
            "anonymous": { "enabled": false },
            "webhook": { "enabled": true, "cacheTTL": "2m0s" }
        },
        "authorization": { "mode": "Webhook" },
        "cgroupDriver": "systemd",
        "clusterDomain": "cluster.local",
        "containerRuntimeEndpoint": "unix:///run/containerd/containerd.sock",
        "hairpinMode": "hairpin-veth",
        "protectKernelDefaults": true,
        "readOnlyPort": 0,
        "serializeImagePulls": false,
        "featureGates": { "RotateKubeletServerCertificate": true }
    });
    match base {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn cluster_fragment(cfg: &NodeConfig) -> Option<Map<String, Value>> {
    let cluster = &cfg.spec.cluster;
    if cluster.cluster_dns.is_empty() {
        return None;
    }
    let mut map = Map::new();
    map.insert("clusterDNS".to_string(), json!(cluster.cluster_dns));
    Some(map)
}

/// Merges the kubelet config for `cfg`.
///
/// # Errors
/// [`ComposeError`] if a fragment fails to convert.
pub fn kubelet_config(cfg: &NodeConfig) -> Result<JsonDocument, ComposeError> {
    let mut overlays = Vec::new();
    if let Some(cluster) = cluster_fragment(cfg) {
        overlays.push(Fragment::json("cluster", cluster));
    }
    if !cfg.spec.kubelet.config.is_empty() {
        overlays.push(Fragment::json("user-kubelet-config", cfg.spec.kubelet.config.clone()));
    }
    merge_json(&Fragment::json("kubelet-base", base_config()), &overlays)
}

/// Renders the environment file: one `KUBELET_ARGS="..."` line.
pub fn kubelet_env(config_path: &Path, flags: &[String]) -> String {
    let mut args = format!("--config={}", config_path.display());
    for flag in flags {
        args.push(' ');
        args.push_str(flag);
    }
    format!("KUBELET_ARGS=\"{}\"\n", escape(&args))
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Node agent managed through the daemon manager.
pub struct KubeletDaemon {
    manager: DaemonManagerRef,
    paths: Paths,
}

impl KubeletDaemon {
    /// Creates the daemon.
    pub fn new(manager: DaemonManagerRef, paths: Paths) -> Self {
        Self { manager, paths }
    }

    /// Creates the daemon and returns it as a shared handle.
    pub fn arc(manager: DaemonManagerRef, paths: Paths) -> DaemonRef {
        Arc::new(Self::new(manager, paths))
    }
}

#[async_trait]
impl Daemon for KubeletDaemon {
    fn name(&self) -> &str {
        KUBELET_DAEMON_NAME
    }

    async fn configure(&self, cfg: &NodeConfig) -> Result<(), DaemonError> {
        let doc = kubelet_config(cfg)?;
        write_file(&self.paths.kubelet_config, &doc.to_json_vec()?).await?;

        let env = kubelet_env(&self.paths.kubelet_config, &cfg.spec.kubelet.flags);
        write_file(&self.paths.kubelet_env, env.as_bytes()).await
    }

    async fn ensure_running(&self, _cfg: &NodeConfig) -> Result<(), DaemonError> {
        self.manager.start_daemon(KUBELET_DAEMON_NAME).await
    }

    async fn post_launch(&self, _cfg: &NodeConfig) -> Result<(), DaemonError> {
        Ok(())
    }
}
