//! The single active transport connection and its write path.

use crate::codec;
use crate::error::NetError;
use crate::stats::LinkStats;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Write half of a connection, type-erased so listeners of any kind can
/// feed the same session.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Identifies one accepted connection for the lifetime of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct ActiveConnection {
    id: ConnectionId,
    writer: BoxedWriter,
    /// Cancelled to tell the connection's receive loop to stop reading.
    closer: CancellationToken,
}

/// Holds at most one live connection and serializes frame writes to it.
///
/// The slot lock is held for the whole prefix/header/payload sequence, so
/// frames from concurrent senders never interleave on the wire. A
/// connection that fails mid-write is removed under the same lock.
pub struct TransportSession {
    slot: Mutex<Option<ActiveConnection>>,
    next_id: AtomicU64,
    stats: Arc<LinkStats>,
}

impl TransportSession {
    pub fn new(stats: Arc<LinkStats>) -> Self {
        Self {
            slot: Mutex::new(None),
            next_id: AtomicU64::new(1),
            stats,
        }
    }

    /// Install `writer` as the active connection.
    ///
    /// Any previous connection is dropped from the slot but not closed; its
    /// receive loop keeps running until its own read fails.
    pub async fn set_active(&self, writer: BoxedWriter, closer: CancellationToken) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let previous = self.slot.lock().await.replace(ActiveConnection { id, writer, closer });
        if let Some(previous) = previous {
            tracing::debug!(old = %previous.id, new = %id, "replacing active connection");
        }
        id
    }

    /// Clear the slot if `id` is still the active connection.
    ///
    /// Returns whether the slot was cleared.
    pub async fn clear_if_active(&self, id: ConnectionId) -> bool {
        let mut slot = self.slot.lock().await;
        if slot.as_ref().is_some_and(|conn| conn.id == id) {
            *slot = None;
            true
        } else {
            false
        }
    }

    pub async fn active_connection(&self) -> Option<ConnectionId> {
        self.slot.lock().await.as_ref().map(|conn| conn.id)
    }

    pub async fn is_connected(&self) -> bool {
        self.active_connection().await.is_some()
    }

    /// Write one frame made of `header` followed by `payload`.
    ///
    /// Without an active connection this is a silent no-op. If any write
    /// fails, the connection is closed and cleared before the error is
    /// returned.
    pub async fn send(&self, header: &[u8], payload: &[u8]) -> Result<(), NetError> {
        let len = header.len() + payload.len();
        let prefix = codec::length_prefix(len)?;

        let mut slot = self.slot.lock().await;
        let Some(conn) = slot.as_mut() else {
            tracing::trace!(len, "no active connection, dropping frame");
            return Ok(());
        };

        if let Err(e) = write_frame(&mut conn.writer, &prefix, header, payload).await {
            if let Some(conn) = slot.take() {
                tracing::debug!(connection = %conn.id, error = %e, "closing connection after write failure");
                conn.closer.cancel();
            }
            return Err(NetError::Io(e));
        }

        self.stats.add_sent(len);
        Ok(())
    }
}

async fn write_frame(
    writer: &mut BoxedWriter,
    prefix: &[u8],
    header: &[u8],
    payload: &[u8],
) -> io::Result<()> {
    writer.write_all(prefix).await?;
    writer.write_all(header).await?;
    writer.write_all(payload).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::AsyncReadExt;

    /// Writer that fails every write with a broken pipe.
    struct BrokenWriter;

    impl AsyncWrite for BrokenWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer gone")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn session() -> (TransportSession, Arc<LinkStats>) {
        let stats = Arc::new(LinkStats::default());
        (TransportSession::new(stats.clone()), stats)
    }

    #[tokio::test]
    async fn send_without_connection_is_noop() {
        let (session, stats) = session();
        session.send(&[0u8; 14], &[1, 2, 3]).await.unwrap();
        assert!(!session.is_connected().await);
        assert_eq!(stats.snapshot().sent_bytes, 0);
    }

    #[tokio::test]
    async fn send_writes_prefix_header_payload() {
        let (session, stats) = session();
        let (local, mut peer) = tokio::io::duplex(256);
        session
            .set_active(Box::new(local), CancellationToken::new())
            .await;

        session.send(&[0xAA; 14], &[1, 2, 3]).await.unwrap();

        let mut wire = [0u8; 19];
        peer.read_exact(&mut wire).await.unwrap();
        assert_eq!(&wire[..2], &[17, 0]);
        assert_eq!(&wire[2..16], &[0xAA; 14]);
        assert_eq!(&wire[16..], &[1, 2, 3]);
        assert_eq!(stats.snapshot().sent_bytes, 17);
    }

    #[tokio::test]
    async fn write_failure_clears_and_closes_connection() {
        let (session, stats) = session();
        let closer = CancellationToken::new();
        session.set_active(Box::new(BrokenWriter), closer.clone()).await;

        let err = session.send(&[0u8; 14], &[0u8; 10]).await.unwrap_err();
        assert!(matches!(err, NetError::Io(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
        assert!(closer.is_cancelled());
        assert!(!session.is_connected().await);

        // Later sends see no connection and succeed without I/O.
        session.send(&[0u8; 14], &[0u8; 10]).await.unwrap();
        assert_eq!(stats.snapshot().sent_bytes, 0);
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected_before_writing() {
        let (session, _stats) = session();
        let (local, _peer) = tokio::io::duplex(64);
        let closer = CancellationToken::new();
        session.set_active(Box::new(local), closer.clone()).await;

        let payload = vec![0u8; codec::MAX_WIRE_FRAME_LEN];
        let err = session.send(&[0u8; 14], &payload).await.unwrap_err();
        assert!(matches!(err, NetError::FrameTooLarge { .. }));
        // The connection itself is healthy and stays active.
        assert!(session.is_connected().await);
        assert!(!closer.is_cancelled());
    }

    #[tokio::test]
    async fn clear_if_active_ignores_superseded_connection() {
        let (session, _stats) = session();
        let (first, _first_peer) = tokio::io::duplex(64);
        let (second, _second_peer) = tokio::io::duplex(64);

        let old = session.set_active(Box::new(first), CancellationToken::new()).await;
        let new = session.set_active(Box::new(second), CancellationToken::new()).await;
        assert_ne!(old, new);

        assert!(!session.clear_if_active(old).await);
        assert_eq!(session.active_connection().await, Some(new));

        assert!(session.clear_if_active(new).await);
        assert_eq!(session.active_connection().await, None);
    }

    #[tokio::test]
    async fn replacing_connection_does_not_cancel_previous_reader() {
        let (session, _stats) = session();
        let (first, _first_peer) = tokio::io::duplex(64);
        let (second, _second_peer) = tokio::io::duplex(64);
        let first_closer = CancellationToken::new();

        session.set_active(Box::new(first), first_closer.clone()).await;
        session.set_active(Box::new(second), CancellationToken::new()).await;

        assert!(!first_closer.is_cancelled());
    }
}
