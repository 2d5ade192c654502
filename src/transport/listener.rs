//! Server role: accept one connection, read one frame, close.

use bytes::Bytes;
use futures::StreamExt;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::core::codec::FrameCodec;
use crate::core::frame::HEADER_SIZE;
use crate::error::{ProtocolError, Result};

/// A bound RCP1 listening socket.
///
/// Each [`receive`](Self::receive) call performs exactly one
/// accept-decode-close cycle. A caller needing multiple messages calls it
/// repeatedly in its own loop. A failed receive leaves the listening socket
/// bound.
#[derive(Debug)]
pub struct FrameListener {
    inner: TcpListener,
}

impl FrameListener {
    /// Bind a listening socket on all interfaces at `port`.
    pub async fn bind(port: u16) -> Result<Self> {
        let inner = TcpListener::bind(("0.0.0.0", port))
            .await
            .map_err(|e| ProtocolError::Bind(format!("port {port}: {e}")))?;
        info!(port, "RCP1 listener bound");
        Ok(Self { inner })
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.inner.local_addr().map_err(Into::into)
    }

    /// Block until one inbound connection arrives, read exactly one frame
    /// from it, and return the payload. The connection is closed on every
    /// exit path, including read failure.
    ///
    /// `cancel` is the explicit shutdown signal: when it fires while the
    /// accept is pending, the call returns [`ProtocolError::Cancelled`]
    /// promptly instead of blocking forever.
    #[instrument(skip(self, cancel))]
    pub async fn receive(&self, cancel: &CancellationToken) -> Result<Bytes> {
        let (stream, peer) = tokio::select! {
            _ = cancel.cancelled() => return Err(ProtocolError::Cancelled),
            accepted = self.inner.accept() => accepted
                .map_err(|e| ProtocolError::Receive(format!("accept failed: {e}")))?,
        };

        debug!(%peer, "accepted RCP1 connection");
        read_one(stream).await
    }
}

/// Read a single frame from a fresh connection, then drop it.
async fn read_one(stream: TcpStream) -> Result<Bytes> {
    let mut framed = Framed::new(stream, FrameCodec::new());
    match framed.next().await {
        Some(Ok(frame)) => {
            debug!(bytes = frame.len(), "frame received");
            Ok(frame.into_payload())
        }
        Some(Err(ProtocolError::Io(e))) => {
            Err(ProtocolError::Receive(format!("read failed: {e}")))
        }
        Some(Err(e)) => Err(e),
        // Peer closed before sending a length prefix.
        None => Err(ProtocolError::IncompleteFrame {
            expected: HEADER_SIZE,
            got: 0,
        }),
    }
}
