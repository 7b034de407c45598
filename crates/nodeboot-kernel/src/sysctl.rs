//! Best-effort kernel tunable writes.
//!
//! A [`Tunable`] never fails the caller: [`Tunable::apply`] reports a
//! [`TunableOutcome`] rather than a `Result`, so a missing kernel module or a
//! read-only `/proc` degrades networking instead of blocking node startup.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Controls whether bridged traffic traverses iptables.
pub const BRIDGE_NF_CALL_IPTABLES: &str = "/proc/sys/net/bridge/bridge-nf-call-iptables";

/// File mode used when the tunable file has to be created.
pub const TUNABLE_FILE_MODE: u32 = 0o640;

/// Result of a best-effort tunable write.  Callers may inspect it, but no
/// variant is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TunableOutcome {
    /// The value was written.
    Applied,
    /// The write failed and was logged as a warning.
    Skipped { reason: String },
}

impl TunableOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, TunableOutcome::Applied)
    }
}

/// A single-value host setting.
pub trait Tunable: Send + Sync {
    /// Filesystem path of the setting, e.g. a file under `/proc/sys`.
    fn path(&self) -> &Path;

    /// Literal value written to [`path`](Self::path).
    fn value(&self) -> &str;

    /// Write the value.  Failures are downgraded to a warning.
    fn apply(&self) -> TunableOutcome;
}

/// A tunable backed by a plain file write.
#[derive(Debug, Clone)]
pub struct SysctlTunable {
    path: PathBuf,
    value: String,
}

impl SysctlTunable {
    pub fn new(path: impl Into<PathBuf>, value: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
        }
    }

    fn write(&self) -> std::io::Result<()> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(TUNABLE_FILE_MODE);
        }
        let mut file = options.open(&self.path)?;
        file.write_all(self.value.as_bytes())
    }
}

impl Tunable for SysctlTunable {
    fn path(&self) -> &Path {
        &self.path
    }

    fn value(&self) -> &str {
        &self.value
    }

    fn apply(&self) -> TunableOutcome {
        match self.write() {
            Ok(()) => {
                debug!(path = %self.path.display(), value = %self.value, "kernel tunable applied");
                TunableOutcome::Applied
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to write value {} at {}",
                    self.value,
                    self.path.display()
                );
                TunableOutcome::Skipped {
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// The bridge-netfilter switch required for service traffic on bridged pods.
pub fn bridge_nf_call_iptables() -> SysctlTunable {
    SysctlTunable::new(BRIDGE_NF_CALL_IPTABLES, "1")
}

/// Prepare host kernel settings before any node component starts.
///
/// Never fails; the outcome is informational.
pub fn configure_host() -> TunableOutcome {
    bridge_nf_call_iptables().apply()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_tunable_targets_fixed_path() {
        let t = bridge_nf_call_iptables();
        assert_eq!(t.path(), Path::new("/proc/sys/net/bridge/bridge-nf-call-iptables"));
        assert_eq!(t.value(), "1");
    }

    #[test]
    fn apply_writes_value() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("bridge-nf-call-iptables");
        std::fs::write(&path, "0").expect("seed");

        let outcome = SysctlTunable::new(&path, "1").apply();
        assert!(outcome.is_applied());
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "1");
    }

    #[cfg(unix)]
    #[test]
    fn apply_creates_file_with_restricted_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("fresh-tunable");

        assert!(SysctlTunable::new(&path, "1").apply().is_applied());

        let mode = std::fs::metadata(&path).expect("metadata").permissions().mode() & 0o777;
        // The process umask can only clear bits.
        assert_eq!(mode & !TUNABLE_FILE_MODE, 0);
    }

    #[test]
    fn unwritable_path_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("missing-dir").join("bridge-nf-call-iptables");

        let outcome = SysctlTunable::new(&path, "1").apply();
        match outcome {
            TunableOutcome::Skipped { reason } => assert!(!reason.is_empty()),
            TunableOutcome::Applied => panic!("write into a missing directory must not succeed"),
        }
        assert!(!path.exists());
        assert!(!SysctlTunable::new(&path, "1").apply().is_applied());
    }
}
