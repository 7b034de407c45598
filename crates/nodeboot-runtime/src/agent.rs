//! [`Agent`] – the node bootstrap orchestrator.
//!
//! One call to [`Agent::run`]:
//!
//! 1. **Init** – one-time process-wide state ([`init_process`]).
//! 2. **Prepare** – fill CNI directory defaults ([`prepare`]).
//! 3. **Launch kubelet** – derive [`kubelet_args`] and start it under the
//!    [`Supervisor`].
//! 4. **Launch kube-proxy** – derive [`kube_proxy_args`] and start it.
//!
//! `run` returns as soon as both launches are initiated.  It does not wait for
//! kubelet to become ready before starting kube-proxy, and it never reports a
//! component failure: that travels through the supervisor's fatal path.
//!
//! # Example
//!
//! ```rust,no_run
//! use nodeboot_runtime::agent::Agent;
//! use nodeboot_types::AgentConfig;
//!
//! # async fn boot() -> Result<(), nodeboot_types::NodeError> {
//! let agent = Agent::with_binaries("/usr/bin/kubelet", "/usr/bin/kube-proxy");
//! let supervisor = agent.run(AgentConfig::default()).await?;
//! supervisor.wait().await;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use nodeboot_types::{AgentConfig, Component, NodeError};
use tracing::{debug, info};

use crate::args::{kube_proxy_args, kubelet_args};
use crate::command::{ComponentCommand, ProcessCommand};
use crate::prepare::prepare;
use crate::supervisor::{ExitProcess, Supervisor, Terminator};

static PROCESS_SEED: OnceLock<u64> = OnceLock::new();

/// Initialise process-wide state once and return the process seed.
///
/// The seed is derived from the wall clock on the first call; later calls
/// return the same value.
pub fn init_process() -> u64 {
    *PROCESS_SEED.get_or_init(|| {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        debug!(seed, "process seed initialised");
        seed
    })
}

/// The seed chosen by [`init_process`], if it has run.
pub fn process_seed() -> Option<u64> {
    PROCESS_SEED.get().copied()
}

/// Holds the two component commands and the fatal-exit policy until
/// [`run`](Agent::run) hands them to a [`Supervisor`].
pub struct Agent {
    kubelet: Box<dyn ComponentCommand>,
    kube_proxy: Box<dyn ComponentCommand>,
    terminator: Arc<dyn Terminator>,
}

impl Agent {
    pub fn new(
        kubelet: Box<dyn ComponentCommand>,
        kube_proxy: Box<dyn ComponentCommand>,
        terminator: Arc<dyn Terminator>,
    ) -> Self {
        Self {
            kubelet,
            kube_proxy,
            terminator,
        }
    }

    /// Production wiring: external binaries, and process exit when either
    /// stops.
    pub fn with_binaries(kubelet_bin: impl Into<PathBuf>, kube_proxy_bin: impl Into<PathBuf>) -> Self {
        Self::new(
            Box::new(ProcessCommand::new(Component::Kubelet, kubelet_bin)),
            Box::new(ProcessCommand::new(Component::KubeProxy, kube_proxy_bin)),
            Arc::new(ExitProcess),
        )
    }

    /// Bootstrap the node components.
    ///
    /// Must be awaited inside a tokio runtime.  The returned [`Supervisor`]
    /// owns the running tasks; dropping it does not stop them.
    ///
    /// # Errors
    ///
    /// None of the steps before launch can currently fail; the `Result`
    /// reserves room for pre-launch validation.
    pub async fn run(self, mut config: AgentConfig) -> Result<Supervisor, NodeError> {
        init_process();
        prepare(&mut config);

        let mut supervisor = Supervisor::new(self.terminator);
        supervisor.launch(Component::Kubelet, self.kubelet, kubelet_args(&config));
        supervisor.launch(Component::KubeProxy, self.kube_proxy, kube_proxy_args(&config));

        info!(
            node_name = %config.node_name,
            cluster_cidr = %config.cluster_cidr,
            "node components launched"
        );
        Ok(supervisor)
    }
}
