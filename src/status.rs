//! Status packet ingress.
//!
//! Players report playback state on UDP/50002. This crate does not
//! decode those packets; it hands the raw datagrams to a [`StatusSink`]
//! supplied by the embedder, whose decoder can evolve independently of
//! the link core.

use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Consumer of raw status datagrams.
///
/// Called synchronously from the status receive task; implementations
/// must not block.
pub trait StatusSink: Send + Sync {
    /// One raw datagram as received on UDP/50002.
    fn consume(&self, datagram: &[u8]);
}

/// Sink that discards all status traffic.
///
/// Used when the embedder only cares about discovery and metadata.
pub struct NoopStatusSink;

impl StatusSink for NoopStatusSink {
    fn consume(&self, _datagram: &[u8]) {
        // No-op
    }
}

/// Spawns the receive loop forwarding status datagrams to `sink`.
pub(crate) fn spawn_status_listener(
    socket: UdpSocket,
    sink: Arc<dyn StatusSink>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = [0u8; 2048];
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                result = socket.recv_from(&mut buf) => match result {
                    Ok((len, _)) => sink.consume(&buf[..len]),
                    Err(e) => tracing::warn!(error = %e, "status recv error"),
                },
            }
        }
        tracing::debug!("status listener stopped");
    })
}
