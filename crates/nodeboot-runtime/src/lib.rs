//! `nodeboot-runtime` – Node Bootstrap Engine
//!
//! Turns a single [`AgentConfig`][nodeboot_types::AgentConfig] into two
//! running, supervised node components.
//!
//! # Modules
//!
//! - [`prepare`] – [`prepare`][prepare::prepare]: fills CNI directory
//!   defaults before any flags are derived.
//! - [`args`] – [`kubelet_args`][args::kubelet_args] and
//!   [`kube_proxy_args`][args::kube_proxy_args]: pure, deterministic flag
//!   builders.
//! - [`command`] – [`ComponentCommand`][command::ComponentCommand]: the
//!   invocation surface, with [`ProcessCommand`][command::ProcessCommand]
//!   running external binaries.
//! - [`supervisor`] – [`Supervisor`][supervisor::Supervisor]: runs each
//!   component on its own task; when any of them stops it stops the rest and
//!   fires a single [`Terminator`][supervisor::Terminator].
//! - [`agent`] – [`Agent`][agent::Agent]: the orchestrator sequencing
//!   init → prepare → kubelet → kube-proxy.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: the global
//!   `tracing` subscriber with optional OTLP span export.
//!
//! # Failure policy
//!
//! A component exiting, for any reason, ends the process once the remaining
//! components have been stopped.
//! [`Agent::run`][agent::Agent::run] only returns errors from steps before
//! launch.

pub mod agent;
pub mod args;
pub mod command;
pub mod prepare;
pub mod supervisor;
pub mod telemetry;

pub use agent::{Agent, init_process, process_seed};
pub use args::{kube_proxy_args, kubelet_args};
pub use command::{ComponentCommand, ProcessCommand, Shutdown};
pub use prepare::{DEFAULT_CNI_BIN_DIR, DEFAULT_CNI_CONF_DIR, prepare};
pub use supervisor::{
    ComponentExit, ExitProcess, FATAL_EXIT_CODE, STOP_TIMEOUT, StopHandle, Supervisor, Terminator,
};
pub use telemetry::{TracerProviderGuard, init_tracing};
