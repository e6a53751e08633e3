//! # Container runtime daemon.
//!
//! Configure writes three files:
//! ```text
//! base-runtime-spec.json  default OCI spec ⊕ spec.containerd.baseRuntimeSpec
//! soci config.toml        only with fast-image-pull
//! config.toml             base ⊕ [soci snapshotter, gated] ⊕ spec.containerd.config
//! ```
//! EnsureRunning starts `containerd`, then `soci-snapshotter.socket` when
//! fast-image-pull is enabled. PostLaunch does nothing.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::{
    daemon::{Daemon, DaemonRef},
    manager::DaemonManagerRef,
    paths::{Paths, write_file},
};
use crate::{
    compose::{Document, Fragment, JsonDocument, merge, merge_json},
    error::{ComposeError, DaemonError},
    node::{FAST_IMAGE_PULL, NodeConfig},
};

/// Unit name of the container runtime.
pub const CONTAINERD_DAEMON_NAME: &str = "containerd";
/// Socket-activated unit of the lazy-pull snapshotter.
pub const SOCI_SNAPSHOTTER_SOCKET_NAME: &str = "soci-snapshotter.socket";

const CRI_PLUGIN: &str = "io.containerd.grpc.v1.cri";

const SOCI_SNAPSHOTTER_FRAGMENT: &str = r#"
[plugins."io.containerd.grpc.v1.cri".containerd]
snapshotter = "soci"
disable_snapshot_annotations = false
discard_unpacked_layers = false

[proxy_plugins.soci]
type = "snapshot"
address = "/run/soci-snapshotter-grpc/soci-snapshotter-grpc.sock"

[proxy_plugins.soci.exports]
root = "/var/lib/soci-snapshotter-grpc"
"#;

const SOCI_SNAPSHOTTER_CONFIG: &str = r#"
[pull_modes.parallel_pull_unpack]
enable = true
max_concurrent_downloads_per_image = 10
concurrent_download_chunk_size = "16mb"
max_concurrent_unpacks_per_image = 10
discard_unpacked_layers = true
"#;

fn base_fragment(paths: &Paths) -> Fragment {
    let spec_path = toml::Value::String(paths.containerd_base_runtime_spec.display().to_string());
    Fragment::toml(
        "containerd-base",
        format!(
            r#"
version = 2
root = "/var/lib/containerd"
state = "/run/containerd"

[grpc]
address = "/run/containerd/containerd.sock"

[plugins."{CRI_PLUGIN}"]
sandbox_image = "registry.k8s.io/pause:3.10"

[plugins."{CRI_PLUGIN}".containerd]
default_runtime_name = "runc"
discard_unpacked_layers = true

[plugins."{CRI_PLUGIN}".containerd.runtimes.runc]
runtime_type = "io.containerd.runc.v2"
base_runtime_spec = {spec_path}

[plugins."{CRI_PLUGIN}".containerd.runtimes.runc.options]
SystemdCgroup = true

[plugins."{CRI_PLUGIN}".cni]
bin_dir = "/opt/cni/bin"
conf_dir = "/etc/cni/net.d"

[plugins."{CRI_PLUGIN}".registry]
config_path = "/etc/containerd/certs.d:/etc/docker/certs.d"
"#
        ),
    )
}

fn default_base_runtime_spec() -> Map<String, Value> {
    let spec = json!({
        "ociVersion": "1.1.0",
        "process": {
            "cwd": "/",
            "noNewPrivileges": true,
            "user": { "uid": 0, "gid": 0 },
            "rlimits": [
                { "type": "RLIMIT_NOFILE", "soft": 65536, "hard": 1048576 }
            ]
        },
        "root": { "path": "rootfs" },
        "linux": {
            "maskedPaths": [
                "/proc/acpi", "/proc/kcore", "/proc/keys", "/proc/latency_stats",
                "/proc/timer_list", "/proc/timer_stats", "/proc/sched_debug",
                "/proc/scsi", "/sys/firmware"
            ],
            "readonlyPaths": [
                "/proc/asound", "/proc/bus", "/proc/fs", "/proc/irq",
                "/proc/sys", "/proc/sysrq-trigger"
            ]
        }
    });
    match spec {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Merges the runtime config for `cfg`: base, gated snapshotter, user overrides.
///
/// # Errors
/// [`ComposeError`] naming the fragment that failed to parse.
pub fn containerd_config(cfg: &NodeConfig, paths: &Paths) -> Result<Document, ComposeError> {
    let mut overlays = Vec::new();
    if cfg.feature_gates().is_enabled(FAST_IMAGE_PULL) {
        overlays.push(Fragment::toml("soci-snapshotter", SOCI_SNAPSHOTTER_FRAGMENT));
    }
    if let Some(user) = &cfg.spec.containerd.config {
        overlays.push(Fragment::toml("user-containerd-config", user.clone()));
    }
    merge(&base_fragment(paths), &overlays)
}

/// Merges the default OCI base runtime spec with the user overlay.
///
/// # Errors
/// [`ComposeError`] if a fragment fails to convert.
pub fn base_runtime_spec(cfg: &NodeConfig) -> Result<JsonDocument, ComposeError> {
    let base = Fragment::json("default-base-runtime-spec", default_base_runtime_spec());
    let overlays = match &cfg.spec.containerd.base_runtime_spec {
        Some(user) => vec![Fragment::json("user-base-runtime-spec", user.clone())],
        None => Vec::new(),
    };
    merge_json(&base, &overlays)
}

/// Container runtime managed through the daemon manager.
pub struct ContainerdDaemon {
    manager: DaemonManagerRef,
    paths: Paths,
}

impl ContainerdDaemon {
    /// Creates the daemon.
    pub fn new(manager: DaemonManagerRef, paths: Paths) -> Self {
        Self { manager, paths }
    }

    /// Creates the daemon and returns it as a shared handle.
    pub fn arc(manager: DaemonManagerRef, paths: Paths) -> DaemonRef {
        Arc::new(Self::new(manager, paths))
    }

    async fn write_base_runtime_spec(&self, cfg: &NodeConfig) -> Result<(), DaemonError> {
        let doc = base_runtime_spec(cfg)?;
        write_file(&self.paths.containerd_base_runtime_spec, &doc.to_json_vec()?).await
    }

    async fn write_snapshotter_config(&self, cfg: &NodeConfig) -> Result<(), DaemonError> {
        if !cfg.feature_gates().is_enabled(FAST_IMAGE_PULL) {
            return Ok(());
        }
        let doc = merge(&Fragment::toml("soci-config", SOCI_SNAPSHOTTER_CONFIG), &[])?;
        write_file(
            &self.paths.soci_snapshotter_config,
            doc.to_toml_string()?.as_bytes(),
        )
        .await
    }

    async fn write_containerd_config(&self, cfg: &NodeConfig) -> Result<(), DaemonError> {
        let doc = containerd_config(cfg, &self.paths)?;
        write_file(&self.paths.containerd_config, doc.to_toml_string()?.as_bytes()).await
    }
}

#[async_trait]
impl Daemon for ContainerdDaemon {
    fn name(&self) -> &str {
        CONTAINERD_DAEMON_NAME
    }

    async fn configure(&self, cfg: &NodeConfig) -> Result<(), DaemonError> {
        self.write_base_runtime_spec(cfg).await?;
        self.write_snapshotter_config(cfg).await?;
        self.write_containerd_config(cfg).await
    }

    async fn ensure_running(&self, cfg: &NodeConfig) -> Result<(), DaemonError> {
        self.manager.start_daemon(CONTAINERD_DAEMON_NAME).await?;
        if cfg.feature_gates().is_enabled(FAST_IMAGE_PULL) {
            return self.manager.start_daemon(SOCI_SNAPSHOTTER_SOCKET_NAME).await;
        }
        Ok(())
    }

    async fn post_launch(&self, _cfg: &NodeConfig) -> Result<(), DaemonError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daemons::testing::RecordingManager;
    use crate::node::FeatureGates;

    fn fast_pull() -> NodeConfig {
        let mut cfg = NodeConfig::default();
        cfg.spec.feature_gates = FeatureGates::new().with(FAST_IMAGE_PULL, true);
        cfg
    }

    fn cri_containerd(doc: &Document) -> &toml::Table {
        doc.get(&["plugins", CRI_PLUGIN, "containerd"])
            .and_then(toml::Value::as_table)
            .unwrap()
    }

    #[test]
    fn test_config_without_fast_image_pull() {
        let doc = containerd_config(&NodeConfig::default(), &Paths::default()).unwrap();
        let containerd = cri_containerd(&doc);
        assert_ne!(
            containerd.get("snapshotter").and_then(toml::Value::as_str),
            Some("soci")
        );
        assert!(doc.get(&["proxy_plugins"]).is_none());
    }

    #[test]
    fn test_config_with_fast_image_pull() {
        let doc = containerd_config(&fast_pull(), &Paths::default()).unwrap();
        assert_eq!(
            doc.get(&["proxy_plugins", "soci", "type"])
                .and_then(toml::Value::as_str),
            Some("snapshot")
        );
        let containerd = cri_containerd(&doc);
        assert_eq!(
            containerd.get("snapshotter").and_then(toml::Value::as_str),
            Some("soci")
        );
        // base keys in the same table survive the overlay
        assert_eq!(
            containerd
                .get("default_runtime_name")
                .and_then(toml::Value::as_str),
            Some("runc")
        );
        assert_eq!(
            containerd
                .get("discard_unpacked_layers")
                .and_then(toml::Value::as_bool),
            Some(false)
        );
    }

    #[test]
    fn test_user_config_is_merged_last() {
        let mut cfg = fast_pull();
        cfg.spec.containerd.config = Some(
            "[plugins.\"io.containerd.grpc.v1.cri\".containerd]\nsnapshotter = \"overlayfs\"\n"
                .to_string(),
        );
        let doc = containerd_config(&cfg, &Paths::default()).unwrap();
        assert_eq!(
            cri_containerd(&doc)
                .get("snapshotter")
                .and_then(toml::Value::as_str),
            Some("overlayfs")
        );
    }

    #[test]
    fn test_malformed_user_config_is_named() {
        let mut cfg = NodeConfig::default();
        cfg.spec.containerd.config = Some("[[[".to_string());
        let err = containerd_config(&cfg, &Paths::default()).unwrap_err();
        assert!(
            matches!(err, ComposeError::Parse { ref fragment, .. } if fragment == "user-containerd-config")
        );
    }

    #[test]
    fn test_base_runtime_spec_overlay_replaces_arrays() {
        let mut cfg = NodeConfig::default();
        let overlay: Map<String, Value> = serde_json::from_str(
            r#"{"process": {"rlimits": [{"type": "RLIMIT_NOFILE", "soft": 1024, "hard": 1024}]}}"#,
        )
        .unwrap();
        cfg.spec.containerd.base_runtime_spec = Some(overlay);

        let doc = base_runtime_spec(&cfg).unwrap();
        let rlimits = doc
            .get(&["process", "rlimits"])
            .and_then(Value::as_array)
            .unwrap();
        assert_eq!(rlimits.len(), 1);
        assert_eq!(rlimits[0]["soft"].as_u64(), Some(1024));
        assert_eq!(doc.get(&["process", "cwd"]).and_then(Value::as_str), Some("/"));
    }

    #[tokio::test]
    async fn test_unbounded_rlimit_is_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::default().under(dir.path());
        let mut cfg = NodeConfig::default();
        cfg.spec.containerd.base_runtime_spec = Some(
            serde_json::from_str(
                r#"{"process": {"rlimits": [{"type": "RLIMIT_NOFILE", "soft": 18446744073709551615, "hard": 18446744073709551615}]}}"#,
            )
            .unwrap(),
        );

        let doc = base_runtime_spec(&cfg).unwrap();
        let rlimits = doc
            .get(&["process", "rlimits"])
            .and_then(Value::as_array)
            .unwrap();
        assert_eq!(rlimits[0]["soft"].as_u64(), Some(u64::MAX));

        ContainerdDaemon::new(RecordingManager::arc(), paths.clone())
            .configure(&cfg)
            .await
            .unwrap();
        let written: Value =
            serde_json::from_slice(&std::fs::read(&paths.containerd_base_runtime_spec).unwrap())
                .unwrap();
        assert_eq!(written["process"]["rlimits"][0]["hard"].as_u64(), Some(u64::MAX));
    }

    #[tokio::test]
    async fn test_configure_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::default().under(dir.path());
        let daemon = ContainerdDaemon::new(RecordingManager::arc(), paths.clone());
        let cfg = fast_pull();

        daemon.configure(&cfg).await.unwrap();
        let first = std::fs::read(&paths.containerd_config).unwrap();
        let first_spec = std::fs::read(&paths.containerd_base_runtime_spec).unwrap();

        daemon.configure(&cfg).await.unwrap();
        assert_eq!(std::fs::read(&paths.containerd_config).unwrap(), first);
        assert_eq!(
            std::fs::read(&paths.containerd_base_runtime_spec).unwrap(),
            first_spec
        );
        assert!(paths.soci_snapshotter_config.exists());

        let written: toml::Table = String::from_utf8(first).unwrap().parse().unwrap();
        assert_eq!(
            written["plugins"][CRI_PLUGIN]["containerd"]["runtimes"]["runc"]["base_runtime_spec"]
                .as_str(),
            Some(paths.containerd_base_runtime_spec.display().to_string().as_str())
        );
    }

    #[tokio::test]
    async fn test_configure_skips_snapshotter_config_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::default().under(dir.path());
        let daemon = ContainerdDaemon::new(RecordingManager::arc(), paths.clone());

        daemon.configure(&NodeConfig::default()).await.unwrap();
        assert!(paths.containerd_config.exists());
        assert!(!paths.soci_snapshotter_config.exists());
    }

    #[tokio::test]
    async fn test_ensure_running_starts_one_unit_when_disabled() {
        let mgr = RecordingManager::new();
        let daemon = ContainerdDaemon::new(mgr.clone(), Paths::default());
        daemon.ensure_running(&NodeConfig::default()).await.unwrap();
        assert_eq!(mgr.started(), vec![CONTAINERD_DAEMON_NAME]);
    }

    #[tokio::test]
    async fn test_ensure_running_starts_socket_after_runtime() {
        let mgr = RecordingManager::new();
        let daemon = ContainerdDaemon::new(mgr.clone(), Paths::default());
        daemon.ensure_running(&fast_pull()).await.unwrap();
        assert_eq!(
            mgr.started(),
            vec![CONTAINERD_DAEMON_NAME, SOCI_SNAPSHOTTER_SOCKET_NAME]
        );
    }

    #[tokio::test]
    async fn test_primary_failure_skips_auxiliary_unit() {
        let mgr = RecordingManager::failing_on(CONTAINERD_DAEMON_NAME);
        let daemon = ContainerdDaemon::new(mgr.clone(), Paths::default());
        let err = daemon.ensure_running(&fast_pull()).await.unwrap_err();
        assert!(matches!(err, DaemonError::UnitStart { ref unit, .. } if unit == CONTAINERD_DAEMON_NAME));
        assert_eq!(mgr.attempted(), vec![CONTAINERD_DAEMON_NAME]);
    }
}
