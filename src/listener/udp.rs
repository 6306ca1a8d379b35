//! UDP echo listener implementation.
//!
//! Reads datagrams and answers each one with a labeled echo addressed back
//! to the sender. Replies are sent from their own task so a stalled send
//! never blocks the read loop. Stateless per datagram: no session state is
//! kept across datagrams from the same sender.

use crate::error::ListenerError;
use crate::listener::{Listener, ListenerConfig, ShutdownSignal, REPLY_PREFIX};
use crate::types::Protocol;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Receive buffer size per datagram.
const MAX_DATAGRAM: usize = 2048;

/// UDP echo listener.
pub struct UdpEchoListener {
    config: ListenerConfig,
}

impl UdpEchoListener {
    pub fn new(config: ListenerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Listener for UdpEchoListener {
    fn protocol(&self) -> Protocol {
        Protocol::Udp
    }

    async fn run(
        self: Box<Self>,
        ready: oneshot::Sender<SocketAddr>,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), ListenerError> {
        let addr = self.config.socket_addr();
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| ListenerError::Bind { addr, source })?;
        let local_addr = socket.local_addr()?;

        debug!(%local_addr, "udp listener ready");
        let _ = ready.send(local_addr);

        let socket = Arc::new(socket);
        let mut buf = vec![0u8; MAX_DATAGRAM];

        loop {
            tokio::select! {
                _ = shutdown.fired() => {
                    debug!(%local_addr, "udp listener shutting down");
                    return Ok(());
                }
                received = socket.recv_from(&mut buf) => match received {
                    Ok((n, peer)) => {
                        debug!(%peer, bytes = n, "incoming datagram");
                        let payload = buf[..n].to_vec();
                        let socket = Arc::clone(&socket);
                        tokio::spawn(async move {
                            reply_datagram(&socket, peer, &payload).await;
                        });
                    }
                    // Transient recv errors are not fatal; keep serving.
                    Err(e) => warn!(error = %e, "recv failed"),
                },
            }
        }
    }
}

/// Answer one datagram with the labeled echo.
async fn reply_datagram(socket: &UdpSocket, peer: SocketAddr, payload: &[u8]) {
    let mut reply = Vec::with_capacity(REPLY_PREFIX.len() + payload.len());
    reply.extend_from_slice(REPLY_PREFIX.as_bytes());
    reply.extend_from_slice(payload);

    if let Err(e) = socket.send_to(&reply, peer).await {
        debug!(%peer, error = %e, "reply send failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::{shutdown_channel, spawn};
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;
    use tokio::time::timeout;

    fn loopback_config(port: u16) -> ListenerConfig {
        ListenerConfig::new(Protocol::Udp, IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    #[tokio::test]
    async fn test_echoes_datagram_with_label() {
        let (handle, signal) = shutdown_channel();
        let spawned = spawn(loopback_config(0), signal);
        let addr = spawned.ready.await.expect("listener should become ready");

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.connect(addr).await.unwrap();
        client.send(b"ping").await.unwrap();

        let mut buf = [0u8; MAX_DATAGRAM];
        let n = timeout(Duration::from_secs(1), client.recv(&mut buf))
            .await
            .expect("reply should arrive")
            .unwrap();
        assert_eq!(&buf[..n], b"Request received: ping");

        handle.shutdown();
        spawned.task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_each_datagram_answered_independently() {
        let (handle, signal) = shutdown_channel();
        let spawned = spawn(loopback_config(0), signal);
        let addr = spawned.ready.await.unwrap();

        let first = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let second = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        first.send_to(b"one", addr).await.unwrap();
        second.send_to(b"two", addr).await.unwrap();

        let mut buf = [0u8; MAX_DATAGRAM];
        let n = timeout(Duration::from_secs(1), first.recv(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..n], b"Request received: one");

        let n = timeout(Duration::from_secs(1), second.recv(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..n], b"Request received: two");

        handle.shutdown();
        spawned.task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_unblocks_recv() {
        let (handle, signal) = shutdown_channel();
        let spawned = spawn(loopback_config(0), signal);
        spawned.ready.await.unwrap();

        handle.shutdown();
        let result = timeout(Duration::from_secs(1), spawned.task)
            .await
            .expect("shutdown should unblock recv within bounded time")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_stop_releases_port() {
        let (handle, signal) = shutdown_channel();
        let spawned = spawn(loopback_config(0), signal);
        let addr = spawned.ready.await.unwrap();

        handle.shutdown();
        timeout(Duration::from_secs(1), spawned.task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        UdpSocket::bind(addr).await.expect("port should be free");
    }
}
