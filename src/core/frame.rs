//! The RCP1 frame: an opaque byte payload and its wire form.

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::Decoder;

use crate::core::codec::FrameCodec;
use crate::error::{ProtocolError, Result};

/// Size of the length prefix in bytes.
pub const HEADER_SIZE: usize = 4;

/// Maximum accepted payload size: 16 MB.
///
/// The wire format itself allows any u32 length; the cap bounds the
/// allocation a remote peer can demand with a single prefix.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// A single framed message.
///
/// The payload is an opaque byte sequence of arbitrary length, including
/// zero. On the wire it is preceded by a 4-byte big-endian unsigned length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The message payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame from a payload.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Total wire size (length prefix + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Consume the frame, returning its payload.
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Encode the frame to its wire form.
    pub fn to_bytes(&self) -> Result<Bytes> {
        if self.payload.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::OversizedFrame(self.payload.len()));
        }
        let mut buf = BytesMut::with_capacity(self.wire_size());
        buf.put_u32(self.payload.len() as u32);
        buf.put_slice(&self.payload);
        Ok(buf.freeze())
    }

    /// Decode a frame from a complete wire buffer.
    ///
    /// Fails with [`ProtocolError::IncompleteFrame`] when `bytes` is shorter
    /// than the declared length, and with [`ProtocolError::OversizedFrame`]
    /// when the prefix exceeds [`MAX_FRAME_SIZE`]. Trailing bytes beyond the
    /// declared length are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut buf = BytesMut::from(bytes);
        match FrameCodec::new().decode(&mut buf)? {
            Some(frame) => Ok(frame),
            None => {
                let expected = if bytes.len() >= HEADER_SIZE {
                    let mut prefix = [0u8; HEADER_SIZE];
                    prefix.copy_from_slice(&bytes[..HEADER_SIZE]);
                    HEADER_SIZE + u32::from_be_bytes(prefix) as usize
                } else {
                    HEADER_SIZE
                };
                Err(ProtocolError::IncompleteFrame {
                    expected,
                    got: bytes.len(),
                })
            }
        }
    }
}

impl From<Vec<u8>> for Frame {
    fn from(payload: Vec<u8>) -> Self {
        Self::new(payload)
    }
}

impl From<&[u8]> for Frame {
    fn from(payload: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(payload))
    }
}
