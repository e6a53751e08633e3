//! # On-disk locations written by the daemons.
//!
//! [`Paths::default`] holds the real system locations; [`Paths::under`]
//! rebases all of them below another root (tests, image builds, chroots).

use std::path::{Path, PathBuf};

/// Files written during the Configure phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Paths {
    /// Container runtime config (TOML).
    pub containerd_config: PathBuf,
    /// Default OCI spec for new containers (JSON).
    pub containerd_base_runtime_spec: PathBuf,
    /// Lazy-pull snapshotter config (TOML); only written with `fast-image-pull`.
    pub soci_snapshotter_config: PathBuf,
    /// Node agent config (JSON).
    pub kubelet_config: PathBuf,
    /// Environment file read by the node agent unit.
    pub kubelet_env: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            containerd_config: PathBuf::from("/etc/containerd/config.toml"),
            containerd_base_runtime_spec: PathBuf::from("/etc/containerd/base-runtime-spec.json"),
            soci_snapshotter_config: PathBuf::from("/etc/soci-snapshotter-grpc/config.toml"),
            kubelet_config: PathBuf::from("/etc/kubernetes/kubelet/config.json"),
            kubelet_env: PathBuf::from("/etc/kubernetes/kubelet/environment"),
        }
    }
}

impl Paths {
    /// Returns the same layout rooted at `root` instead of `/`.
    #[must_use]
    pub fn under(&self, root: &Path) -> Self {
        let rebase = |p: &Path| root.join(p.strip_prefix("/").unwrap_or(p));
        Self {
            containerd_config: rebase(&self.containerd_config),
            containerd_base_runtime_spec: rebase(&self.containerd_base_runtime_spec),
            soci_snapshotter_config: rebase(&self.soci_snapshotter_config),
            kubelet_config: rebase(&self.kubelet_config),
            kubelet_env: rebase(&self.kubelet_env),
        }
    }
}

/// Overwrites `path` with `contents`, creating parent directories.
pub(crate) async fn write_file(path: &Path, contents: &[u8]) -> Result<(), crate::DaemonError> {
    let wrap = |source| crate::DaemonError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(wrap)?;
    }
    tokio::fs::write(path, contents).await.map_err(wrap)
}
