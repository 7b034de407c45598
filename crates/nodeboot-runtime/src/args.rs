//! Startup flag derivation for the node components.
//!
//! Both builders are pure and deterministic: the same [`AgentConfig`] always
//! yields the same ordered argument list.  They never validate; an empty
//! `kube_config` is passed through as an empty flag value and rejected by the
//! component itself.
//!
//! # Override contract
//!
//! `extra_kubelet_args` is appended last.  The component flag parsers keep the
//! final occurrence of a repeated flag, so an extra `--cgroup-root /other`
//! replaces the built-in value.  The builders rely on that behavior; they do
//! not deduplicate.

use nodeboot_types::AgentConfig;

/// Ordered argument list with flag/value helpers.
#[derive(Default)]
struct ArgList(Vec<String>);

impl ArgList {
    fn flag(&mut self, flag: &str) -> &mut Self {
        self.0.push(flag.to_string());
        self
    }

    fn pair(&mut self, flag: &str, value: impl Into<String>) -> &mut Self {
        self.0.push(flag.to_string());
        self.0.push(value.into());
        self
    }

    /// Emit the pair only when `value` is non-empty.
    fn pair_if_set(&mut self, flag: &str, value: &str) -> &mut Self {
        if !value.is_empty() {
            self.pair(flag, value);
        }
        self
    }

    fn extend(&mut self, extra: &[String]) -> &mut Self {
        self.0.extend_from_slice(extra);
        self
    }

    fn into_vec(self) -> Vec<String> {
        self.0
    }
}

/// Derive the kubelet command line from `config`.
///
/// Call after [`prepare`][crate::prepare::prepare] so the CNI directories are
/// populated.
pub fn kubelet_args(config: &AgentConfig) -> Vec<String> {
    let mut args = ArgList::default();
    args.pair("--healthz-bind-address", "127.0.0.1")
        .pair("--read-only-port", "0")
        .flag("--allow-privileged=true")
        .pair("--cluster-domain", "cluster.local")
        .pair("--kubeconfig", config.kube_config.as_str())
        .pair("--eviction-hard", "imagefs.available<5%,nodefs.available<5%")
        .pair(
            "--eviction-minimum-reclaim",
            "imagefs.available=10%,nodefs.available=10%",
        )
        .flag("--feature-gates=MountPropagation=true")
        .pair("--node-ip", config.node_ip.as_str())
        .flag("--fail-swap-on=false")
        .pair("--cgroup-root", "/k3s")
        .pair("--cgroup-driver", "cgroupfs")
        .pair("--cni-conf-dir", config.cni_conf_dir.as_str())
        .pair("--cni-bin-dir", config.cni_bin_dir.as_str());

    if !config.cluster_dns.is_empty() {
        let dns = config
            .cluster_dns
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        args.pair("--cluster-dns", dns);
    }
    args.pair_if_set("--container-runtime-endpoint", &config.runtime_socket)
        .pair_if_set("--address", &config.listen_address);
    if !config.ca_cert_path.is_empty() {
        args.flag("--anonymous-auth=false")
            .pair("--client-ca-file", config.ca_cert_path.as_str());
    }
    args.pair_if_set("--hostname-override", &config.node_name)
        .extend(&config.extra_kubelet_args);

    args.into_vec()
}

/// Derive the kube-proxy command line from `config`.
///
/// The shared `extra_kubelet_args` are appended here too, followed by the
/// proxy-only `extra_kube_proxy_args`.
pub fn kube_proxy_args(config: &AgentConfig) -> Vec<String> {
    let mut args = ArgList::default();
    args.pair("--proxy-mode", "iptables")
        .pair("--healthz-bind-address", "127.0.0.1")
        .pair("--kubeconfig", config.kube_config.as_str())
        .pair("--cluster-cidr", config.cluster_cidr.to_string())
        .extend(&config.extra_kubelet_args)
        .extend(&config.extra_kube_proxy_args);

    args.into_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prepare::prepare;

    fn base_config() -> AgentConfig {
        let mut cfg = AgentConfig {
            kube_config: "/etc/k/config".to_string(),
            cluster_cidr: "10.42.0.0/16".parse().unwrap(),
            ..AgentConfig::default()
        };
        prepare(&mut cfg);
        cfg
    }

    fn unconditional_kubelet_args(cfg: &AgentConfig) -> Vec<String> {
        [
            "--healthz-bind-address",
            "127.0.0.1",
            "--read-only-port",
            "0",
            "--allow-privileged=true",
            "--cluster-domain",
            "cluster.local",
            "--kubeconfig",
            cfg.kube_config.as_str(),
            "--eviction-hard",
            "imagefs.available<5%,nodefs.available<5%",
            "--eviction-minimum-reclaim",
            "imagefs.available=10%,nodefs.available=10%",
            "--feature-gates=MountPropagation=true",
            "--node-ip",
            cfg.node_ip.as_str(),
            "--fail-swap-on=false",
            "--cgroup-root",
            "/k3s",
            "--cgroup-driver",
            "cgroupfs",
            "--cni-conf-dir",
            cfg.cni_conf_dir.as_str(),
            "--cni-bin-dir",
            cfg.cni_bin_dir.as_str(),
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn count(args: &[String], flag: &str) -> usize {
        args.iter().filter(|a| *a == flag).count()
    }

    #[test]
    fn kubelet_minimal_config_emits_only_unconditional_flags() {
        let cfg = base_config();
        let args = kubelet_args(&cfg);
        assert_eq!(args, unconditional_kubelet_args(&cfg));
        assert!(args.contains(&"/opt/cni/bin".to_string()));
        assert!(args.contains(&"/etc/cni/net.d".to_string()));
    }

    #[test]
    fn kubelet_empty_node_ip_is_still_emitted() {
        let args = kubelet_args(&base_config());
        let idx = args.iter().position(|a| a == "--node-ip").unwrap();
        assert_eq!(args[idx + 1], "");
    }

    #[test]
    fn kubelet_conditional_flags_follow_in_order() {
        let mut cfg = base_config();
        cfg.cluster_dns = vec!["10.43.0.10".parse().unwrap()];
        cfg.runtime_socket = "/run/containerd/containerd.sock".to_string();
        cfg.listen_address = "0.0.0.0".to_string();
        cfg.ca_cert_path = "/etc/k/ca.crt".to_string();
        cfg.node_name = "worker-1".to_string();

        let args = kubelet_args(&cfg);
        let base = unconditional_kubelet_args(&cfg);
        assert_eq!(&args[..base.len()], base.as_slice());
        assert_eq!(
            &args[base.len()..],
            &[
                "--cluster-dns",
                "10.43.0.10",
                "--container-runtime-endpoint",
                "/run/containerd/containerd.sock",
                "--address",
                "0.0.0.0",
                "--anonymous-auth=false",
                "--client-ca-file",
                "/etc/k/ca.crt",
                "--hostname-override",
                "worker-1",
            ]
        );
    }

    #[test]
    fn kubelet_cluster_dns_absent_when_empty() {
        let args = kubelet_args(&base_config());
        assert_eq!(count(&args, "--cluster-dns"), 0);
    }

    #[test]
    fn kubelet_cluster_dns_single_address() {
        let mut cfg = base_config();
        cfg.cluster_dns = vec!["10.43.0.10".parse().unwrap()];
        let args = kubelet_args(&cfg);
        assert_eq!(count(&args, "--cluster-dns"), 1);
        let idx = args.iter().position(|a| a == "--cluster-dns").unwrap();
        assert_eq!(args[idx + 1], "10.43.0.10");
    }

    #[test]
    fn kubelet_cluster_dns_multiple_addresses_are_comma_joined() {
        let mut cfg = base_config();
        cfg.cluster_dns = vec!["10.43.0.10".parse().unwrap(), "fd00::a".parse().unwrap()];
        let args = kubelet_args(&cfg);
        let idx = args.iter().position(|a| a == "--cluster-dns").unwrap();
        assert_eq!(args[idx + 1], "10.43.0.10,fd00::a");
    }

    #[test]
    fn kubelet_ca_cert_flags_appear_together() {
        let mut cfg = base_config();
        let without = kubelet_args(&cfg);
        assert_eq!(count(&without, "--anonymous-auth=false"), 0);
        assert_eq!(count(&without, "--client-ca-file"), 0);

        cfg.ca_cert_path = "/etc/k/ca.crt".to_string();
        let with = kubelet_args(&cfg);
        let idx = with.iter().position(|a| a == "--anonymous-auth=false").unwrap();
        assert_eq!(with[idx + 1], "--client-ca-file");
        assert_eq!(with[idx + 2], "/etc/k/ca.crt");
    }

    #[test]
    fn kubelet_empty_optional_strings_omit_flags() {
        let args = kubelet_args(&base_config());
        for flag in [
            "--container-runtime-endpoint",
            "--address",
            "--hostname-override",
        ] {
            assert_eq!(count(&args, flag), 0, "{flag} must be omitted");
        }
    }

    #[test]
    fn kube_proxy_minimal_config_scenario() {
        let args = kube_proxy_args(&base_config());
        assert_eq!(
            args,
            [
                "--proxy-mode",
                "iptables",
                "--healthz-bind-address",
                "127.0.0.1",
                "--kubeconfig",
                "/etc/k/config",
                "--cluster-cidr",
                "10.42.0.0/16",
            ]
        );
    }

    #[test]
    fn kube_proxy_renders_canonical_cidr() {
        let mut cfg = base_config();
        cfg.cluster_cidr = "10.42.99.1/16".parse().unwrap();
        let args = kube_proxy_args(&cfg);
        assert_eq!(args[7], "10.42.0.0/16");
    }

    #[test]
    fn extra_args_are_appended_last_to_both() {
        let mut cfg = base_config();
        cfg.extra_kubelet_args = vec!["--v".to_string(), "4".to_string()];
        cfg.node_name = "worker-1".to_string();

        let kubelet = kubelet_args(&cfg);
        assert_eq!(&kubelet[kubelet.len() - 2..], &["--v", "4"]);
        assert_eq!(kubelet[kubelet.len() - 3], "worker-1");

        let proxy = kube_proxy_args(&cfg);
        assert_eq!(proxy.len(), 10);
        assert_eq!(&proxy[8..], &["--v", "4"]);
    }

    #[test]
    fn extra_args_can_repeat_builtin_flags() {
        let mut cfg = base_config();
        cfg.extra_kubelet_args = vec!["--cgroup-root".to_string(), "/custom".to_string()];
        let args = kubelet_args(&cfg);
        assert_eq!(count(&args, "--cgroup-root"), 2);
        assert_eq!(args.last().unwrap(), "/custom");
    }

    #[test]
    fn proxy_only_extra_args_skip_kubelet() {
        let mut cfg = base_config();
        cfg.extra_kubelet_args = vec!["--v".to_string(), "4".to_string()];
        cfg.extra_kube_proxy_args = vec!["--masquerade-all".to_string()];

        let kubelet = kubelet_args(&cfg);
        assert_eq!(count(&kubelet, "--masquerade-all"), 0);

        let proxy = kube_proxy_args(&cfg);
        assert_eq!(&proxy[8..], &["--v", "4", "--masquerade-all"]);
    }

    #[test]
    fn empty_kube_config_passes_through() {
        let mut cfg = base_config();
        cfg.kube_config.clear();
        let args = kube_proxy_args(&cfg);
        assert_eq!(args[4], "--kubeconfig");
        assert_eq!(args[5], "");
    }

    #[test]
    fn builders_are_deterministic() {
        let mut cfg = base_config();
        cfg.cluster_dns = vec!["10.43.0.10".parse().unwrap()];
        cfg.extra_kubelet_args = vec!["--v".to_string(), "2".to_string()];
        assert_eq!(kubelet_args(&cfg), kubelet_args(&cfg));
        assert_eq!(kube_proxy_args(&cfg), kube_proxy_args(&cfg));
    }
}
