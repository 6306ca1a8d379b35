//! Error types for portcheck.
//!
//! Uses `thiserror` for ergonomic error definitions. Configuration and
//! listener-bind errors are fatal to a run; probe errors are recorded
//! per target and never abort sibling probes.

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Pre-flight configuration errors. Always fatal, raised before any
/// network activity.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("port is required and must be nonzero")]
    MissingPort,

    #[error("at least one target is required")]
    NoTargets,

    #[error("invalid protocol: {0}")]
    InvalidProtocol(String),
}

/// Errors raised by the echo listeners.
#[derive(Error, Debug)]
pub enum ListenerError {
    /// The listener could not bind its socket. Fatal to the whole run
    /// when listening is enabled.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: io::Error,
    },

    #[error("listener IO error: {0}")]
    Io(#[from] io::Error),
}

/// Per-target probe failures. Non-fatal: recorded as that target's
/// outcome and never retried.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("connection failed: {0}")]
    Dial(#[source] io::Error),

    #[error("connection timed out")]
    Timeout,

    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    #[error("read failed: {0}")]
    Read(#[source] io::Error),
}

/// Top-level error for a full verification run.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("listener task failed: {0}")]
    ListenerJoin(#[from] tokio::task::JoinError),

    #[error("listener stopped before becoming ready")]
    ListenerStopped,
}

/// Result type alias for probe operations.
pub type ProbeIoResult<T> = Result<T, ProbeError>;
