use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The two long-running node components started by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    /// Runs workloads on the node.
    Kubelet,
    /// Programs service routing rules.
    KubeProxy,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Kubelet => write!(f, "kubelet"),
            Component::KubeProxy => write!(f, "kube-proxy"),
        }
    }
}

/// A pod network range, stored in canonical form (host bits cleared).
///
/// ```
/// use nodeboot_types::ClusterCidr;
///
/// let cidr: ClusterCidr = "10.42.7.9/16".parse().unwrap();
/// assert_eq!(cidr.to_string(), "10.42.0.0/16");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClusterCidr {
    network: IpAddr,
    prefix_len: u8,
}

impl ClusterCidr {
    /// Build a range from any address inside it and a prefix length.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::InvalidCidr`] when `prefix_len` exceeds the
    /// address family's width.
    pub fn new(addr: IpAddr, prefix_len: u8) -> Result<Self, NodeError> {
        let network = match addr {
            IpAddr::V4(v4) => {
                if prefix_len > 32 {
                    return Err(NodeError::InvalidCidr {
                        input: format!("{addr}/{prefix_len}"),
                        reason: "IPv4 prefix length must be at most 32".to_string(),
                    });
                }
                let mask = u32::MAX.checked_shl(32 - u32::from(prefix_len)).unwrap_or(0);
                IpAddr::V4(Ipv4Addr::from(u32::from(v4) & mask))
            }
            IpAddr::V6(v6) => {
                if prefix_len > 128 {
                    return Err(NodeError::InvalidCidr {
                        input: format!("{addr}/{prefix_len}"),
                        reason: "IPv6 prefix length must be at most 128".to_string(),
                    });
                }
                let mask = u128::MAX.checked_shl(128 - u32::from(prefix_len)).unwrap_or(0);
                IpAddr::V6(Ipv6Addr::from(u128::from(v6) & mask))
            }
        };
        Ok(Self { network, prefix_len })
    }

    pub fn network(&self) -> IpAddr {
        self.network
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }
}

impl Default for ClusterCidr {
    fn default() -> Self {
        Self {
            network: IpAddr::V4(Ipv4Addr::new(10, 42, 0, 0)),
            prefix_len: 16,
        }
    }
}

impl fmt::Display for ClusterCidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

impl FromStr for ClusterCidr {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| NodeError::InvalidCidr {
            input: s.to_string(),
            reason: reason.to_string(),
        };
        let (addr, prefix) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| invalid("missing '/<prefix>' suffix"))?;
        let addr: IpAddr = addr.parse().map_err(|_| invalid("malformed address"))?;
        let prefix_len: u8 = prefix
            .parse()
            .map_err(|_| invalid("malformed prefix length"))?;
        Self::new(addr, prefix_len)
    }
}

impl TryFrom<String> for ClusterCidr {
    type Error = NodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClusterCidr> for String {
    fn from(cidr: ClusterCidr) -> Self {
        cidr.to_string()
    }
}

/// Node agent configuration, populated upstream and consumed by the
/// bootstrap orchestrator.
///
/// Empty strings mean "not set": the matching flag is omitted (or, for
/// `kube_config`, passed through empty so the component reports it).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Credentials/config file used by both components.
    pub kube_config: String,
    pub cluster_cidr: ClusterCidr,
    /// Empty means no `--cluster-dns` flag.
    pub cluster_dns: Vec<IpAddr>,
    pub node_ip: String,
    pub node_name: String,
    pub listen_address: String,
    pub ca_cert_path: String,
    pub runtime_socket: String,
    pub cni_bin_dir: String,
    pub cni_conf_dir: String,
    /// Raw flags appended last to BOTH the kubelet and kube-proxy argument
    /// lists. A flag only one component understands reaches the other as
    /// well; prefer [`extra_kube_proxy_args`](Self::extra_kube_proxy_args)
    /// for proxy-only flags.
    pub extra_kubelet_args: Vec<String>,
    /// Raw flags appended to kube-proxy only, after `extra_kubelet_args`.
    pub extra_kube_proxy_args: Vec<String>,
}

/// Errors raised while bootstrapping the node agent.
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("invalid cluster CIDR {input:?}: {reason}")]
    InvalidCidr { input: String, reason: String },

    #[error("failed to start {component}: {details}")]
    Spawn { component: Component, details: String },

    #[error("{component} failed: {details}")]
    ComponentFailed { component: Component, details: String },

    #[error("{component} panicked: {details}")]
    ComponentPanicked { component: Component, details: String },
}
