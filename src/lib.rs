//! # Portcheck - A Dual-Protocol Network Reachability Verifier
//!
//! Portcheck validates that a port is open and round-trippable across a set
//! of hosts, e.g. when checking firewall or NAT rules across a fleet.
//!
//! It optionally starts a local echo-style listener (TCP or UDP) on a given
//! port, then concurrently probes every target host on that same port:
//! each probe dials with a timeout, sends a fixed token, and reads the
//! echoed reply. One result line is reported per target.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use portcheck::lifecycle::{run, RunConfig};
//! use portcheck::types::Protocol;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = RunConfig::new(Protocol::Tcp, 9000, vec!["10.0.0.1".into()])
//!         .with_timeout(Duration::from_secs(2));
//!
//!     for result in run(config).await.unwrap() {
//!         println!("{}: {:?}", result.target, result.outcome);
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Core type definitions (protocol, targets, outcomes)
//! - [`listener`] - TCP/UDP echo listeners behind a common trait
//! - [`probe`] - Concurrent probe orchestrator
//! - [`lifecycle`] - Sequences listener startup, probing, and shutdown
//! - [`error`] - Error taxonomy
//! - [`output`] - Result formatting

pub mod cli;
pub mod error;
pub mod lifecycle;
pub mod listener;
pub mod output;
pub mod probe;
pub mod types;

// Re-export commonly used types
pub use error::{ConfigError, ListenerError, ProbeError, RunError};
pub use lifecycle::{run, Lifecycle, RunConfig};
pub use listener::{shutdown_channel, Listener, ListenerConfig, ShutdownHandle, ShutdownSignal};
pub use types::{ProbeOutcome, ProbeResult, ProbeTarget, Protocol};
