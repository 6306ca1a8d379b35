//! Lifecycle coordinator.
//!
//! Sequences a full verification run: spawn the listener (unless
//! `no_listen`), wait for it to report readiness, hold the configured
//! startup stagger, probe every target, hold the drain grace period so
//! in-flight echo connections can finish, then fire the shutdown signal
//! and join the listener task.
//!
//! The coordinator is the sole owner of the shutdown handle, and readiness
//! is an explicit notification from the listener (the bound address sent
//! over a oneshot channel), not a blind sleep.

use crate::error::{ConfigError, RunError};
use crate::listener::{self, shutdown_channel, ListenerConfig, ShutdownHandle};
use crate::probe::run_probes;
use crate::types::{ProbeResult, ProbeTarget, Protocol};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

/// Plain configuration record for one verification run, as produced by the
/// CLI layer.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Protocol for both the local listener and the outbound probes.
    pub protocol: Protocol,
    /// Port to listen on and to probe on every target.
    pub port: u16,
    /// Local address the listener binds to.
    pub bind_addr: IpAddr,
    /// Per-target dial/reply timeout.
    pub timeout: Duration,
    /// Stagger held after the listener reports ready, before probing.
    pub startup_delay: Duration,
    /// Grace period held after probing, before the listener is stopped.
    pub shutdown_grace: Duration,
    /// Skip the local listener and only probe remote targets.
    pub no_listen: bool,
    /// Hosts to probe.
    pub targets: Vec<String>,
}

impl RunConfig {
    /// Create a config with the defaults the CLI uses.
    pub fn new(protocol: Protocol, port: u16, targets: Vec<String>) -> Self {
        Self {
            protocol,
            port,
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            timeout: Duration::from_secs(30),
            startup_delay: Duration::from_secs(15),
            shutdown_grace: Duration::from_secs(30),
            no_listen: false,
            targets,
        }
    }

    /// Set the bind address.
    pub fn with_bind_addr(mut self, bind_addr: IpAddr) -> Self {
        self.bind_addr = bind_addr;
        self
    }

    /// Set the per-target timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the startup stagger.
    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    /// Set the drain grace period.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Disable the local listener.
    pub fn without_listener(mut self) -> Self {
        self.no_listen = true;
        self
    }

    /// Pre-flight validation. Fatal errors, raised before any network
    /// activity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::MissingPort);
        }
        if self.targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        Ok(())
    }

    /// The probe targets: every host on the configured port.
    pub fn probe_targets(&self) -> Vec<ProbeTarget> {
        self.targets
            .iter()
            .map(|host| ProbeTarget::new(host.clone(), self.port))
            .collect()
    }
}

/// A running listener owned by the coordinator.
struct ListenerTask {
    handle: ShutdownHandle,
    task: JoinHandle<Result<(), crate::error::ListenerError>>,
}

/// A verification run that has passed validation and (if enabled) has its
/// listener up and ready.
pub struct Lifecycle {
    config: RunConfig,
    listener: Option<ListenerTask>,
}

impl Lifecycle {
    /// Validate the config, spawn the listener, and wait for readiness
    /// plus the startup stagger. With `no_listen` set this only validates.
    ///
    /// A listener bind failure is fatal to the whole run.
    pub async fn start(config: RunConfig) -> Result<Self, RunError> {
        config.validate()?;

        if config.no_listen {
            debug!("no-listen mode, skipping local listener");
            return Ok(Self {
                config,
                listener: None,
            });
        }

        let (handle, signal) = shutdown_channel();
        let listener_config =
            ListenerConfig::new(config.protocol, config.bind_addr, config.port);
        let spawned = listener::spawn(listener_config, signal);

        let bound: SocketAddr = match spawned.ready.await {
            Ok(addr) => addr,
            // Readiness channel closed without a value: the listener never
            // came up. Join the task to surface the bind error.
            Err(_) => {
                return Err(match spawned.task.await {
                    Ok(Err(e)) => RunError::Listener(e),
                    Ok(Ok(())) => RunError::ListenerStopped,
                    Err(join_err) => RunError::ListenerJoin(join_err),
                });
            }
        };
        info!(%bound, protocol = %config.protocol, "listener ready");

        if !config.startup_delay.is_zero() {
            debug!(delay = ?config.startup_delay, "holding startup stagger");
            sleep(config.startup_delay).await;
        }

        Ok(Self {
            config,
            listener: Some(ListenerTask {
                handle,
                task: spawned.task,
            }),
        })
    }

    /// Probe every configured target and wait for all of them to finish.
    pub async fn probe(&self) -> Vec<ProbeResult> {
        let targets = self.config.probe_targets();
        info!(
            targets = targets.len(),
            protocol = %self.config.protocol,
            "probing targets"
        );
        run_probes(&targets, self.config.protocol, self.config.timeout).await
    }

    /// Hold the drain grace period, fire the shutdown signal exactly once,
    /// and join the listener task. A no-op in `no_listen` mode.
    pub async fn shutdown(self) -> Result<(), RunError> {
        let Some(listener) = self.listener else {
            return Ok(());
        };

        if !self.config.shutdown_grace.is_zero() {
            debug!(grace = ?self.config.shutdown_grace, "holding drain grace period");
            sleep(self.config.shutdown_grace).await;
        }

        listener.handle.shutdown();
        listener.task.await??;
        debug!("listener stopped");
        Ok(())
    }
}

/// Run the whole lifecycle and return the collected results.
pub async fn run(config: RunConfig) -> Result<Vec<ProbeResult>, RunError> {
    let lifecycle = Lifecycle::start(config).await?;
    let results = lifecycle.probe().await;
    lifecycle.shutdown().await?;
    Ok(results)
}
