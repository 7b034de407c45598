//! [`Supervisor`] – fail-fast supervision of node components.
//!
//! Each launched [`ComponentCommand`] runs on its own tokio task.  When any of
//! them returns, cleanly or not, the task reports a [`ComponentExit`] to a
//! single watcher.  The watcher logs the first exit, asks every other
//! component to stop, waits up to [`STOP_TIMEOUT`] for them, and then fires
//! the [`Terminator`] exactly once.  There is no restart and no backoff: a
//! node with only one of its two components running is worse than no node.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use nodeboot_types::{Component, NodeError};
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{error, info, warn};

use crate::command::{ComponentCommand, Shutdown};

/// Exit code used when a component stops.
pub const FATAL_EXIT_CODE: i32 = 1;

/// How long surviving components get to stop before termination goes ahead.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(10);

// ─────────────────────────────────────────────────────────────────────────────
// Exit reports
// ─────────────────────────────────────────────────────────────────────────────

/// Why a supervised component stopped.
#[derive(Debug)]
pub struct ComponentExit {
    pub component: Component,
    pub outcome: Result<(), NodeError>,
}

impl ComponentExit {
    /// `true` when the component returned without an error.  Still fatal.
    pub fn is_clean(&self) -> bool {
        self.outcome.is_ok()
    }
}

impl fmt::Display for ComponentExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Ok(()) => write!(f, "{} exited: no error", self.component),
            Err(e) => write!(f, "{} exited: {e}", self.component),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Termination trigger
// ─────────────────────────────────────────────────────────────────────────────

/// Action taken when a supervised component stops.
pub trait Terminator: Send + Sync {
    fn terminate(&self, exit: &ComponentExit);
}

/// Ends the whole process with [`FATAL_EXIT_CODE`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ExitProcess;

impl Terminator for ExitProcess {
    fn terminate(&self, _exit: &ComponentExit) {
        std::process::exit(FATAL_EXIT_CODE);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Supervisor
// ─────────────────────────────────────────────────────────────────────────────

struct LaunchedTask {
    component: Component,
    // Dropping a JoinHandle detaches the task; it keeps running.
    _handle: JoinHandle<()>,
}

/// Owns every launched component task and the single termination trigger.
///
/// Must be created inside a tokio runtime.
pub struct Supervisor {
    exit_tx: mpsc::UnboundedSender<ComponentExit>,
    stop_tx: Arc<watch::Sender<bool>>,
    tasks: Vec<LaunchedTask>,
    watcher: JoinHandle<Option<ComponentExit>>,
}

impl Supervisor {
    pub fn new(terminator: Arc<dyn Terminator>) -> Self {
        let (exit_tx, mut exit_rx) = mpsc::unbounded_channel::<ComponentExit>();
        let (stop_tx, _) = watch::channel(false);
        let stop_tx = Arc::new(stop_tx);

        let watcher_stop = Arc::clone(&stop_tx);
        let watcher = tokio::spawn(async move {
            let exit = exit_rx.recv().await?;
            error!(
                component = %exit.component,
                clean = exit.is_clean(),
                "{exit}"
            );
            stop_components(&watcher_stop).await;
            terminator.terminate(&exit);
            Some(exit)
        });

        Self {
            exit_tx,
            stop_tx,
            tasks: Vec::new(),
            watcher,
        }
    }

    /// Hand `args` to `command` and run it on a new task.
    ///
    /// Returns as soon as the task is spawned.  A panic inside
    /// [`ComponentCommand::execute`] is reported as
    /// [`NodeError::ComponentPanicked`].
    pub fn launch(
        &mut self,
        component: Component,
        mut command: Box<dyn ComponentCommand>,
        args: Vec<String>,
    ) {
        info!(component = %component, args = ?args, "launching component");
        command.set_args(args);

        let shutdown = Shutdown::new(self.stop_tx.subscribe());
        let exit_tx = self.exit_tx.clone();
        let handle = tokio::spawn(async move {
            let run = tokio::spawn(async move { command.execute(shutdown).await });
            let outcome = match run.await {
                Ok(outcome) => outcome,
                Err(e) => Err(NodeError::ComponentPanicked {
                    component,
                    details: e.to_string(),
                }),
            };
            // The watcher is gone only after it already terminated.
            let _ = exit_tx.send(ComponentExit { component, outcome });
        });

        self.tasks.push(LaunchedTask {
            component,
            _handle: handle,
        });
    }

    /// Components in launch order.
    pub fn launched(&self) -> Vec<Component> {
        self.tasks.iter().map(|t| t.component).collect()
    }

    /// A handle that stops every component without firing the terminator.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            stop_tx: Arc::clone(&self.stop_tx),
            watcher: self.watcher.abort_handle(),
        }
    }

    /// Wait for the exit that fired the terminator.
    ///
    /// With [`ExitProcess`] this never returns, because the process ends
    /// first.  Returns `None` when nothing was launched.
    pub async fn wait(self) -> Option<ComponentExit> {
        let Supervisor {
            exit_tx,
            stop_tx,
            tasks,
            watcher,
        } = self;
        // Launched tasks hold their own senders; ours must not keep the
        // watcher alive when nothing was launched.
        drop(exit_tx);
        drop(stop_tx);
        drop(tasks);
        watcher.await.ok().flatten()
    }
}

/// Operator-initiated stop, obtained from [`Supervisor::stop_handle`].
#[derive(Debug, Clone)]
pub struct StopHandle {
    stop_tx: Arc<watch::Sender<bool>>,
    watcher: AbortHandle,
}

impl StopHandle {
    /// Stop every running component and wait (up to [`STOP_TIMEOUT`]) until
    /// they are gone.  The exits this causes are not treated as fatal.
    pub async fn stop(&self) {
        self.watcher.abort();
        stop_components(&self.stop_tx).await;
    }
}

async fn stop_components(stop_tx: &watch::Sender<bool>) {
    stop_tx.send_replace(true);
    // Each running component holds one receiver until `execute` returns.
    if tokio::time::timeout(STOP_TIMEOUT, stop_tx.closed()).await.is_err() {
        warn!(timeout = ?STOP_TIMEOUT, "components still running after stop request");
    } else {
        info!("all components stopped");
    }
}
