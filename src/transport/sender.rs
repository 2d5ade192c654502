//! Client role: open one connection, write one frame, close.

use futures::SinkExt;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, instrument};

use crate::core::codec::FrameCodec;
use crate::core::frame::Frame;
use crate::error::{ProtocolError, Result};

/// Push one framed message to `destination` on `port`.
///
/// Opens a fresh outbound connection, writes the length prefix and payload,
/// and closes the connection regardless of outcome. Single attempt only —
/// no retry or backoff. Connect and write failures surface as
/// [`ProtocolError::Send`].
#[instrument(skip(payload), fields(bytes = payload.len()))]
pub async fn send_frame(destination: &str, port: u16, payload: &[u8]) -> Result<()> {
    let stream = TcpStream::connect((destination, port))
        .await
        .map_err(|e| ProtocolError::Send(format!("connect to {destination}:{port} failed: {e}")))?;

    let mut framed = Framed::new(stream, FrameCodec::new());
    framed
        .send(Frame::from(payload))
        .await
        .map_err(|e| match e {
            ProtocolError::Io(io) => ProtocolError::Send(format!("write failed: {io}")),
            other => other,
        })?;

    debug!(destination, port, "frame sent");
    Ok(())
}
