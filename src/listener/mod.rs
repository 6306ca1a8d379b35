//! Echo listener module.
//!
//! Provides a common [`Listener`] trait over the TCP and UDP echo server
//! implementations, the single-fire shutdown signal used to stop them, and
//! a `spawn` helper that launches a listener as a background task and hands
//! back a readiness channel carrying the bound address.

pub mod tcp;
pub mod udp;

use crate::error::ListenerError;
use crate::types::Protocol;
use async_trait::async_trait;
use std::net::{IpAddr, SocketAddr};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::debug;

pub use tcp::TcpEchoListener;
pub use udp::UdpEchoListener;

/// Label prefixed to every echoed reply, TCP and UDP alike.
pub const REPLY_PREFIX: &str = "Request received: ";

/// Fixed message written to a TCP peer when reading its input fails.
pub const READ_FAILURE_REPLY: &str = "failed to read input";

/// Configuration for an echo listener. The protocol is fixed at
/// construction and never changes during the listener's run.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub protocol: Protocol,
    pub bind_addr: IpAddr,
    pub port: u16,
}

impl ListenerConfig {
    pub fn new(protocol: Protocol, bind_addr: IpAddr, port: u16) -> Self {
        Self {
            protocol,
            bind_addr,
            port,
        }
    }

    /// The address the listener will bind to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

/// Create the shutdown signal pair.
///
/// The [`ShutdownHandle`] is held by a single owner; firing it consumes the
/// handle, so the signal cannot be fired twice by construction. Receivers
/// are cheap to clone and observe the same single-fire broadcast.
pub fn shutdown_channel() -> (ShutdownHandle, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx }, ShutdownSignal { rx })
}

/// Exclusive capability to fire the shutdown signal.
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    /// Fire the signal. Consumes the handle; once fired, it stays fired.
    pub fn shutdown(self) {
        let _ = self.tx.send(true);
    }
}

/// Receiving side of the single-fire shutdown broadcast.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Poll whether the signal has fired.
    pub fn is_fired(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the signal fires. Resolves immediately if it already
    /// has. A dropped handle counts as fired, so a listener never hangs
    /// on a coordinator that went away.
    pub async fn fired(&mut self) {
        // Err means the handle was dropped without firing; treat as fired.
        let _ = self.rx.wait_for(|fired| *fired).await;
    }
}

/// Trait for echo listener implementations.
///
/// `run` binds the socket, reports the bound address through `ready`, and
/// serves until the shutdown signal fires, at which point it returns
/// cleanly. On bind failure `ready` is dropped unsent and `run` returns
/// the error.
#[async_trait]
pub trait Listener: Send {
    /// The protocol this listener serves.
    fn protocol(&self) -> Protocol;

    /// Bind and serve until shutdown.
    async fn run(
        self: Box<Self>,
        ready: oneshot::Sender<SocketAddr>,
        shutdown: ShutdownSignal,
    ) -> Result<(), ListenerError>;
}

/// Construct the listener implementation for the configured protocol.
pub fn new_listener(config: ListenerConfig) -> Box<dyn Listener> {
    match config.protocol {
        Protocol::Tcp => Box::new(TcpEchoListener::new(config)),
        Protocol::Udp => Box::new(UdpEchoListener::new(config)),
    }
}

/// A listener running as a background task.
pub struct SpawnedListener {
    /// Resolves with the bound address once the listener is serving.
    /// Closed without a value if the bind failed; join `task` for the
    /// error in that case.
    pub ready: oneshot::Receiver<SocketAddr>,
    /// The listener task itself.
    pub task: JoinHandle<Result<(), ListenerError>>,
}

/// Spawn a listener for `config`, stoppable via `shutdown`.
pub fn spawn(config: ListenerConfig, shutdown: ShutdownSignal) -> SpawnedListener {
    let (ready_tx, ready_rx) = oneshot::channel();
    let listener = new_listener(config);
    debug!(protocol = %listener.protocol(), "spawning listener");
    let task = tokio::spawn(listener.run(ready_tx, shutdown));

    SpawnedListener {
        ready: ready_rx,
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_signal_starts_unfired() {
        let (_handle, signal) = shutdown_channel();
        assert!(!signal.is_fired());
    }

    #[tokio::test]
    async fn test_signal_fires_once_and_stays_fired() {
        let (handle, signal) = shutdown_channel();
        let mut observer = signal.clone();

        handle.shutdown();

        assert!(signal.is_fired());
        assert!(observer.is_fired());

        // fired() must resolve immediately after the fact
        tokio::time::timeout(Duration::from_millis(100), observer.fired())
            .await
            .expect("fired() should resolve for an already-fired signal");
    }

    #[tokio::test]
    async fn test_fired_wakes_blocked_waiter() {
        let (handle, mut signal) = shutdown_channel();

        let waiter = tokio::spawn(async move {
            signal.fired().await;
        });

        handle.shutdown();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should be released")
            .unwrap();
    }

    #[tokio::test]
    async fn test_dropped_handle_counts_as_fired() {
        let (handle, mut signal) = shutdown_channel();
        drop(handle);

        tokio::time::timeout(Duration::from_millis(100), signal.fired())
            .await
            .expect("dropped handle should release waiters");
    }

    #[test]
    fn test_factory_builds_matching_protocol() {
        for protocol in [Protocol::Tcp, Protocol::Udp] {
            let config = ListenerConfig::new(protocol, "127.0.0.1".parse().unwrap(), 0);
            assert_eq!(new_listener(config).protocol(), protocol);
        }
    }

    #[test]
    fn test_config_socket_addr() {
        let config = ListenerConfig::new(Protocol::Tcp, "127.0.0.1".parse().unwrap(), 9000);
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:9000");
    }
}
