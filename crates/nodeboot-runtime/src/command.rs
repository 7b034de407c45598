//! The invocation surface for node components.
//!
//! The orchestrator never runs kubelet or kube-proxy logic itself.  It hands
//! an argument list to a [`ComponentCommand`] and lets the supervisor drive
//! [`ComponentCommand::execute`] on its own task.  Once any component has
//! exited, the supervisor raises [`Shutdown`] so the others stop before the
//! process ends.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use nodeboot_types::{Component, NodeError};
use tokio::sync::watch;
use tracing::{info, warn};

/// Stop request shared by every supervised component.
///
/// Raised at most once, by the supervisor, after the first component exit.
#[derive(Debug, Clone)]
pub struct Shutdown(watch::Receiver<bool>);

impl Shutdown {
    pub(crate) fn new(rx: watch::Receiver<bool>) -> Self {
        Self(rx)
    }

    /// Resolve once a stop has been requested.  Returns immediately if it
    /// already was.
    pub async fn requested(&mut self) {
        // A closed channel means the supervisor is gone, which only happens
        // after it has asked everyone to stop.
        let _ = self.0.wait_for(|stop| *stop).await;
    }

    pub fn is_requested(&self) -> bool {
        *self.0.borrow()
    }
}

/// A long-running node component that accepts a flag list and blocks until
/// it exits.
///
/// # Contract
///
/// * `set_args` – replaces the argument list used by the next `execute`.
/// * `execute` – runs the component to completion.  A component is never
///   expected to return during normal operation, so the supervisor treats
///   both `Ok` and `Err` as fatal.  When `shutdown` fires, the component must
///   stop and release everything it started (child processes included)
///   before returning.
#[async_trait]
pub trait ComponentCommand: Send + 'static {
    fn set_args(&mut self, args: Vec<String>);

    async fn execute(&mut self, shutdown: Shutdown) -> Result<(), NodeError>;
}

/// Runs a component as an external binary, inheriting stdout and stderr.
#[derive(Debug, Clone)]
pub struct ProcessCommand {
    component: Component,
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessCommand {
    pub fn new(component: Component, program: impl Into<PathBuf>) -> Self {
        Self {
            component,
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[async_trait]
impl ComponentCommand for ProcessCommand {
    fn set_args(&mut self, args: Vec<String>) {
        self.args = args;
    }

    async fn execute(&mut self, mut shutdown: Shutdown) -> Result<(), NodeError> {
        let component = self.component;
        let mut child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| NodeError::Spawn {
                component,
                details: format!("{}: {e}", self.program.display()),
            })?;

        info!(
            component = %component,
            program = %self.program.display(),
            pid = ?child.id(),
            "component process started"
        );

        let status = tokio::select! {
            status = child.wait() => status,
            () = shutdown.requested() => {
                // SIGKILL, then reap.
                if let Err(e) = child.kill().await {
                    warn!(component = %component, error = %e, "failed to kill component process");
                }
                info!(component = %component, "component process stopped");
                return Ok(());
            }
        }
        .map_err(|e| NodeError::ComponentFailed {
            component,
            details: format!("waiting for process: {e}"),
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(NodeError::ComponentFailed {
                component,
                details: status.to_string(),
            })
        }
    }
}
