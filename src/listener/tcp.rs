//! TCP echo listener implementation.
//!
//! Accepts stream connections and echoes each received line back with a
//! fixed label. Every accepted connection is served by its own task so a
//! slow peer never blocks the accept loop.

use crate::error::ListenerError;
use crate::listener::{Listener, ListenerConfig, ShutdownSignal, READ_FAILURE_REPLY, REPLY_PREFIX};
use crate::types::Protocol;
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// TCP echo listener.
pub struct TcpEchoListener {
    config: ListenerConfig,
}

impl TcpEchoListener {
    pub fn new(config: ListenerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Listener for TcpEchoListener {
    fn protocol(&self) -> Protocol {
        Protocol::Tcp
    }

    async fn run(
        self: Box<Self>,
        ready: oneshot::Sender<SocketAddr>,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), ListenerError> {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ListenerError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        debug!(%local_addr, "tcp listener ready");
        let _ = ready.send(local_addr);

        loop {
            tokio::select! {
                _ = shutdown.fired() => {
                    debug!(%local_addr, "tcp listener shutting down");
                    return Ok(());
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "incoming connection");
                        tokio::spawn(handle_connection(stream, peer));
                    }
                    // Transient accept errors are not fatal; keep serving.
                    Err(e) => warn!(error = %e, "accept failed"),
                },
            }
        }
    }
}

/// Serve one accepted connection until the peer closes or errors.
///
/// Reads line by line; each line is answered with the labeled echo. On any
/// read error (EOF included) a fixed failure message is written best-effort
/// and the connection is dropped. No idle timeout is enforced.
async fn handle_connection(stream: TcpStream, peer: SocketAddr) {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let reply = format!("{REPLY_PREFIX}{line}\n");
                if let Err(e) = writer.write_all(reply.as_bytes()).await {
                    debug!(%peer, error = %e, "reply write failed");
                    return;
                }
            }
            Ok(None) => {
                debug!(%peer, "peer closed connection");
                let _ = writer.write_all(READ_FAILURE_REPLY.as_bytes()).await;
                return;
            }
            Err(e) => {
                debug!(%peer, error = %e, "read failed");
                let _ = writer.write_all(READ_FAILURE_REPLY.as_bytes()).await;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::{shutdown_channel, spawn};
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio::time::timeout;

    fn loopback_config(port: u16) -> ListenerConfig {
        ListenerConfig::new(Protocol::Tcp, IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    async fn read_reply(stream: &mut TcpStream) -> String {
        let mut buf = vec![0u8; 4096];
        let n = stream.read(&mut buf).await.unwrap();
        String::from_utf8_lossy(&buf[..n]).into_owned()
    }

    #[tokio::test]
    async fn test_echoes_lines_with_label() {
        let (handle, signal) = shutdown_channel();
        let spawned = spawn(loopback_config(0), signal);
        let addr = spawned.ready.await.expect("listener should become ready");

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"hello\n").await.unwrap();
        assert_eq!(read_reply(&mut stream).await, "Request received: hello\n");

        // Handler keeps serving subsequent lines on the same connection
        stream.write_all(b"again\n").await.unwrap();
        assert_eq!(read_reply(&mut stream).await, "Request received: again\n");

        drop(stream);
        handle.shutdown();
        timeout(Duration::from_secs(1), spawned.task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_unblocks_accept() {
        let (handle, signal) = shutdown_channel();
        let spawned = spawn(loopback_config(0), signal);
        spawned.ready.await.unwrap();

        // No connection is ever made; the accept loop is parked.
        handle.shutdown();
        let result = timeout(Duration::from_secs(1), spawned.task)
            .await
            .expect("shutdown should unblock accept within bounded time")
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

        // The exact address must be rebindable after stop
        TcpListener::bind(addr).await.expect("port should be free");
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let occupant = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = occupant.local_addr().unwrap().port();

        let (_handle, signal) = shutdown_channel();
        let spawned = spawn(loopback_config(port), signal);

        // Readiness channel closes without a value...
        assert!(spawned.ready.await.is_err());
        // ...and the task reports the bind error.
        let result = spawned.task.await.unwrap();
        assert!(matches!(result, Err(ListenerError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_slow_peer_does_not_block_other_connections() {
        let (handle, signal) = shutdown_channel();
        let spawned = spawn(loopback_config(0), signal);
        let addr = spawned.ready.await.unwrap();

        // First peer connects and stays silent
        let _idle = TcpStream::connect(addr).await.unwrap();

        // Second peer still gets served
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"ping\n").await.unwrap();
        let reply = timeout(Duration::from_secs(1), read_reply(&mut stream))
            .await
            .expect("second connection should not be starved");
        assert_eq!(reply, "Request received: ping\n");

        handle.shutdown();
        spawned.task.await.unwrap().unwrap();
    }
}
