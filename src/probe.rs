//! Probe orchestrator - concurrent reachability checks.
//!
//! Dials every target concurrently, sends the probe token, and performs a
//! single bounded read of the reply. Each target gets exactly one attempt
//! and produces exactly one [`ProbeResult`]; a failing target never aborts
//! or delays its siblings. The orchestrator returns only once every
//! target's task has finished.

use crate::error::{ProbeError, ProbeIoResult};
use crate::types::{ProbeResult, ProbeTarget, Protocol};
use futures::stream::{self, StreamExt};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{lookup_host, TcpStream, UdpSocket};
use tokio::time::timeout;
use tracing::debug;

/// Fixed payload written to each target.
pub const PROBE_TOKEN: &[u8] = b"TEST\n";

/// Size of the single bounded reply read.
const REPLY_BUFFER: usize = 4096;

/// Probe all targets concurrently and wait for every one to finish.
///
/// Result order is unspecified; every input target appears exactly once.
pub async fn run_probes(
    targets: &[ProbeTarget],
    protocol: Protocol,
    timeout: Duration,
) -> Vec<ProbeResult> {
    let concurrency = targets.len().max(1);

    stream::iter(targets.to_vec())
        .map(|target| async move {
            let outcome = probe_target(&target, protocol, timeout).await;
            match outcome {
                Ok(bytes_received) => {
                    debug!(%target, bytes_received, "probe succeeded");
                    ProbeResult::success(target, bytes_received)
                }
                Err(e) => {
                    debug!(%target, error = %e, "probe failed");
                    ProbeResult::failure(target, e)
                }
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await
}

/// Single probe attempt: dial, write the token, one bounded read.
async fn probe_target(
    target: &ProbeTarget,
    protocol: Protocol,
    timeout: Duration,
) -> ProbeIoResult<usize> {
    match protocol {
        Protocol::Tcp => probe_tcp(target, timeout).await,
        Protocol::Udp => probe_udp(target, timeout).await,
    }
}

async fn probe_tcp(target: &ProbeTarget, deadline: Duration) -> ProbeIoResult<usize> {
    let mut stream = timeout(
        deadline,
        TcpStream::connect((target.host.as_str(), target.port)),
    )
    .await
    .map_err(|_| ProbeError::Timeout)?
    .map_err(ProbeError::Dial)?;

    stream
        .write_all(PROBE_TOKEN)
        .await
        .map_err(ProbeError::Write)?;

    let mut reply = vec![0u8; REPLY_BUFFER];
    let n = timeout(deadline, stream.read(&mut reply))
        .await
        .map_err(|_| ProbeError::Timeout)?
        .map_err(ProbeError::Read)?;

    // A zero-byte read means the peer closed without replying; an
    // accepter that never echoes is not round-trippable.
    if n == 0 {
        return Err(ProbeError::Read(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed before replying",
        )));
    }

    Ok(n)
}

async fn probe_udp(target: &ProbeTarget, deadline: Duration) -> ProbeIoResult<usize> {
    let addr = lookup_host((target.host.as_str(), target.port))
        .await
        .map_err(ProbeError::Dial)?
        .next()
        .ok_or_else(|| {
            ProbeError::Dial(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no addresses resolved",
            ))
        })?;

    let local = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
    let socket = UdpSocket::bind(local).await.map_err(ProbeError::Dial)?;
    socket.connect(addr).await.map_err(ProbeError::Dial)?;

    // One send, one receive. A lost datagram is a Failure; there is no
    // retry (single-attempt semantics).
    socket.send(PROBE_TOKEN).await.map_err(ProbeError::Write)?;

    let mut reply = vec![0u8; REPLY_BUFFER];
    let n = timeout(deadline, socket.recv(&mut reply))
        .await
        .map_err(|_| ProbeError::Timeout)?
        .map_err(ProbeError::Read)?;

    Ok(n)
}
