//! `nodeboot` – node agent bootstrap binary.
//!
//! 1. Initialises structured logging (`RUST_LOG`, `NODEBOOT_LOG_FORMAT`).
//! 2. Loads `/etc/nodeboot/config.toml` (or `$NODEBOOT_CONFIG`) plus
//!    `NODEBOOT_*` overrides.
//! 3. Enables bridge-netfilter on the host, best effort.
//! 4. Starts kubelet and kube-proxy under fail-fast supervision: if either
//!    exits, the process exits.
//! 5. On Ctrl-C, stops both components and exits with code 130.
//!
//! `nodeboot --print-args` prints the derived component flags and exits
//! without touching the host.

mod config;

use std::process::ExitCode;

use colored::Colorize;
use nodeboot_kernel::configure_host;
use nodeboot_runtime::{
    Agent, FATAL_EXIT_CODE, init_tracing, kube_proxy_args, kubelet_args, prepare,
};
use nodeboot_types::AgentConfig;
use tracing::{debug, error, info, warn};

/// Exit code after an operator interrupt.
const INTERRUPTED_EXIT_CODE: u8 = 130;

fn main() -> ExitCode {
    let _guard = init_tracing("nodeboot");
    let print_only = std::env::args().skip(1).any(|a| a == "--print-args");

    let cfg = match config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(path = %config::config_path().display(), error = %e, "config error");
            return ExitCode::FAILURE;
        }
    };
    if cfg.agent.kube_config.is_empty() {
        warn!("no kube_config set; components will receive an empty --kubeconfig");
    }

    if print_only {
        print_args(&cfg.agent);
        return ExitCode::SUCCESS;
    }

    // ── Host preparation ──────────────────────────────────────────────────
    // Never fatal; a failure has already been logged as a warning.
    let tunable = configure_host();
    debug!(applied = tunable.is_applied(), "host tunables configured");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let (stop_tx, mut stop_rx) = tokio::sync::mpsc::unbounded_channel::<()>();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; interrupt will not stop components cleanly");
    }

    runtime.block_on(async move {
        info!(
            config = %config::config_path().display(),
            kubelet = %cfg.kubelet_bin.display(),
            kube_proxy = %cfg.kube_proxy_bin.display(),
            "starting node agent"
        );
        let agent = Agent::with_binaries(cfg.kubelet_bin.clone(), cfg.kube_proxy_bin.clone());
        let supervisor = match agent.run(cfg.agent).await {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "node agent bootstrap failed");
                return ExitCode::FAILURE;
            }
        };

        let stopper = supervisor.stop_handle();
        tokio::select! {
            exit = supervisor.wait() => {
                // Only reached if the terminator returned instead of exiting.
                if let Some(exit) = exit {
                    error!("{exit}");
                }
                ExitCode::from(FATAL_EXIT_CODE as u8)
            }
            _ = stop_rx.recv() => {
                warn!("interrupt received; stopping node components");
                stopper.stop().await;
                ExitCode::from(INTERRUPTED_EXIT_CODE)
            }
        }
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Dry run
// ─────────────────────────────────────────────────────────────────────────────

fn print_args(agent: &AgentConfig) {
    let mut agent = agent.clone();
    prepare(&mut agent);

    println!(
        "{} {}",
        "nodeboot".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    print_component("kubelet", &kubelet_args(&agent));
    print_component("kube-proxy", &kube_proxy_args(&agent));
}

fn print_component(name: &str, args: &[String]) {
    println!();
    println!("  {}", name.bold().cyan());
    for arg in args {
        println!("    {arg}");
    }
}
