//! Accepting peer connections for a [`TapEndpoint`].

use crate::endpoint::TapEndpoint;
use crate::error::NetError;
use std::future::Future;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tracing::info;

/// A source of peer connections.
pub trait FrameListener: Send {
    type Stream: AsyncRead + AsyncWrite + Send + 'static;

    /// Wait for the next connection.
    fn accept(&mut self) -> impl Future<Output = io::Result<Self::Stream>> + Send;
}

impl FrameListener for TcpListener {
    type Stream = TcpStream;

    async fn accept(&mut self) -> io::Result<TcpStream> {
        let (stream, peer) = TcpListener::accept(self).await?;
        stream.set_nodelay(true)?;
        info!(%peer, "accepted tcp client");
        Ok(stream)
    }
}

#[cfg(unix)]
impl FrameListener for tokio::net::UnixListener {
    type Stream = tokio::net::UnixStream;

    async fn accept(&mut self) -> io::Result<tokio::net::UnixStream> {
        let (stream, _) = tokio::net::UnixListener::accept(self).await?;
        info!("accepted unix client");
        Ok(stream)
    }
}

impl TapEndpoint {
    /// Accept connections until the listener fails.
    ///
    /// Each accepted connection replaces the active one and gets its own
    /// receive loop. Connection failures never end this loop; only an
    /// accept error does, and it is returned to the caller.
    pub async fn accept_connections<L: FrameListener>(&self, mut listener: L) -> Result<(), NetError> {
        info!("waiting for packets...");
        loop {
            let stream = listener.accept().await.map_err(NetError::Accept)?;
            let conn = self.adopt_connection(stream).await;
            info!(connection = %conn.id(), "new peer connection");
        }
    }
}
