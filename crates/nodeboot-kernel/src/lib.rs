//! `nodeboot-kernel` – Host Preparation
//!
//! Host-level settings the node needs before its components start.
//!
//! # Modules
//!
//! - [`sysctl`] – [`Tunable`][sysctl::Tunable] and
//!   [`SysctlTunable`][sysctl::SysctlTunable]: best-effort writes of single
//!   kernel values.  [`configure_host`][sysctl::configure_host] enables
//!   bridge-netfilter so iptables sees bridged pod traffic; a failure is
//!   logged and never aborts startup.

pub mod sysctl;

pub use sysctl::{
    BRIDGE_NF_CALL_IPTABLES, SysctlTunable, Tunable, TunableOutcome, bridge_nf_call_iptables,
    configure_host,
};
