//! Default filling for path-like [`AgentConfig`] fields.

use nodeboot_types::AgentConfig;

/// Where CNI plugin binaries live when the config does not say.
pub const DEFAULT_CNI_BIN_DIR: &str = "/opt/cni/bin";
/// Where CNI network configs live when the config does not say.
pub const DEFAULT_CNI_CONF_DIR: &str = "/etc/cni/net.d";

/// Fill `cni_bin_dir` and `cni_conf_dir` with their defaults when empty.
///
/// Touches no other field and is idempotent.
pub fn prepare(config: &mut AgentConfig) {
    if config.cni_bin_dir.is_empty() {
        config.cni_bin_dir = DEFAULT_CNI_BIN_DIR.to_string();
    }
    if config.cni_conf_dir.is_empty() {
        config.cni_conf_dir = DEFAULT_CNI_CONF_DIR.to_string();
    }
}
