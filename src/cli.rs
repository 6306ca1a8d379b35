//! CLI definition.
//!
//! Thin glue over the core: flags and defaults mirror the original fleet
//! tool (`--port`, `--proto`, `--bind`, `--timeout`, `--delay`, `--sleep`,
//! `--no-listen`, positional targets) and are folded into a [`RunConfig`].

use crate::lifecycle::RunConfig;
use crate::types::Protocol;
use clap::Parser;
use std::net::IpAddr;
use std::time::Duration;

/// Portcheck - verify a port is open and round-trippable across hosts.
///
/// Starts a local echo listener on the given port (unless --no-listen),
/// then concurrently probes every target host on that port and reports
/// one OK/Error line per target.
#[derive(Parser, Debug)]
#[command(name = "portcheck")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Dual-protocol network reachability verifier", long_about = None)]
pub struct Cli {
    /// Port to listen on and check
    #[arg(short, long)]
    pub port: u16,

    /// Protocol to use
    #[arg(long = "proto", value_enum, ignore_case = true, default_value = "tcp")]
    pub protocol: Protocol,

    /// Bind the local listener to a specific address
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Seconds to wait for each probe's reply
    #[arg(short, long, default_value = "30")]
    pub timeout: u64,

    /// Seconds to wait after listener startup before probing
    #[arg(long, default_value = "15")]
    pub delay: u64,

    /// Seconds to sleep after probing before stopping the listener
    #[arg(long, default_value = "30")]
    pub sleep: u64,

    /// Do not start a local listener, only check remote targets
    #[arg(long)]
    pub no_listen: bool,

    /// Output format for results
    #[arg(short, long, value_enum, default_value = "plain")]
    pub output: OutputFormat,

    /// Hosts to check
    #[arg(value_name = "TARGET", required = true)]
    pub targets: Vec<String>,
}

impl Cli {
    /// Fold the parsed flags into the core configuration record.
    pub fn run_config(&self) -> RunConfig {
        let config = RunConfig::new(self.protocol, self.port, self.targets.clone())
            .with_bind_addr(self.bind)
            .with_timeout(Duration::from_secs(self.timeout))
            .with_startup_delay(Duration::from_secs(self.delay))
            .with_shutdown_grace(Duration::from_secs(self.sleep));

        if self.no_listen {
            config.without_listener()
        } else {
            config
        }
    }
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One human-readable line per target
    Plain,
    /// JSON array of results
    Json,
}
