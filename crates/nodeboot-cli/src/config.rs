//! Configuration Vault – reads `/etc/nodeboot/config.toml`.
//!
//! ```toml
//! kubelet_bin = "/usr/local/bin/kubelet"
//!
//! [agent]
//! kube_config = "/var/lib/nodeboot/kubeconfig.yaml"
//! cluster_cidr = "10.42.0.0/16"
//! cluster_dns = ["10.43.0.10"]
//! extra_kubelet_args = ["--v", "2"]
//! ```

use nodeboot_types::{AgentConfig, ClusterCidr};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Used when `NODEBOOT_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/nodeboot/config.toml";

/// Everything the `nodeboot` binary needs to start a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Kubelet executable; bare names are resolved through `PATH`.
    #[serde(default = "default_kubelet_bin")]
    pub kubelet_bin: PathBuf,

    /// Kube-proxy executable.
    #[serde(default = "default_kube_proxy_bin")]
    pub kube_proxy_bin: PathBuf,

    #[serde(default)]
    pub agent: AgentConfig,
}

fn default_kubelet_bin() -> PathBuf {
    PathBuf::from("kubelet")
}
fn default_kube_proxy_bin() -> PathBuf {
    PathBuf::from("kube-proxy")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kubelet_bin: default_kubelet_bin(),
            kube_proxy_bin: default_kube_proxy_bin(),
            agent: AgentConfig::default(),
        }
    }
}

/// Return `NODEBOOT_CONFIG`, or [`DEFAULT_CONFIG_PATH`].
pub fn config_path() -> PathBuf {
    std::env::var_os("NODEBOOT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load the config file (defaults when absent) and apply env overrides.
pub fn load() -> Result<Config, String> {
    let mut cfg = load_from(&config_path())?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Load the config from a specific path.  Returns `None` if the file does
/// not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config = toml::from_str(&raw)
        .map_err(|e| format!("Failed to parse config at {}: {}", path.display(), e))?;
    Ok(Some(cfg))
}

/// Apply `NODEBOOT_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `NODEBOOT_KUBECONFIG` | `agent.kube_config` |
/// | `NODEBOOT_NODE_NAME` | `agent.node_name` |
/// | `NODEBOOT_NODE_IP` | `agent.node_ip` |
/// | `NODEBOOT_CLUSTER_CIDR` | `agent.cluster_cidr` |
/// | `NODEBOOT_RUNTIME_SOCKET` | `agent.runtime_socket` |
/// | `NODEBOOT_KUBELET_BIN` | `kubelet_bin` |
/// | `NODEBOOT_KUBE_PROXY_BIN` | `kube_proxy_bin` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("NODEBOOT_KUBECONFIG") {
        cfg.agent.kube_config = v;
    }
    if let Ok(v) = std::env::var("NODEBOOT_NODE_NAME") {
        cfg.agent.node_name = v;
    }
    if let Ok(v) = std::env::var("NODEBOOT_NODE_IP") {
        cfg.agent.node_ip = v;
    }
    if let Ok(v) = std::env::var("NODEBOOT_CLUSTER_CIDR") {
        match v.parse::<ClusterCidr>() {
            Ok(cidr) => cfg.agent.cluster_cidr = cidr,
            Err(e) => warn!(error = %e, "ignoring NODEBOOT_CLUSTER_CIDR"),
        }
    }
    if let Ok(v) = std::env::var("NODEBOOT_RUNTIME_SOCKET") {
        cfg.agent.runtime_socket = v;
    }
    if let Ok(v) = std::env::var("NODEBOOT_KUBELET_BIN") {
        cfg.kubelet_bin = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("NODEBOOT_KUBE_PROXY_BIN") {
        cfg.kube_proxy_bin = PathBuf::from(v);
    }
}
