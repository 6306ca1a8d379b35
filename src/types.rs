//! Core type definitions.
//!
//! Plain data carried between the CLI layer, the listeners, and the probe
//! orchestrator. All of these are immutable once constructed.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transport protocol used for both the local listener and the probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Udp => write!(f, "udp"),
        }
    }
}

impl std::str::FromStr for Protocol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            _ => Err(ConfigError::InvalidProtocol(s.to_string())),
        }
    }
}

/// A single host:port to verify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeTarget {
    /// Hostname or IP address.
    pub host: String,
    /// Port to dial.
    pub port: u16,
}

impl ProbeTarget {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ProbeTarget {
    /// Renders `host:port`, the form used both for dialing and reporting.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Outcome of a single probe attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProbeOutcome {
    /// The target answered; `bytes_received` counts the reply bytes from
    /// the single bounded read.
    Success { bytes_received: usize },
    /// Dial, timeout, or read failure, rendered as text.
    Failure { error: String },
}

impl ProbeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Result of probing one target. Produced exactly once per target.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub target: ProbeTarget,
    pub outcome: ProbeOutcome,
}

impl ProbeResult {
    /// Create a success result.
    pub fn success(target: ProbeTarget, bytes_received: usize) -> Self {
        Self {
            target,
            outcome: ProbeOutcome::Success { bytes_received },
        }
    }

    /// Create a failure result from any displayable error.
    pub fn failure(target: ProbeTarget, error: impl fmt::Display) -> Self {
        Self {
            target,
            outcome: ProbeOutcome::Failure {
                error: error.to_string(),
            },
        }
    }
}
