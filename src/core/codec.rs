//! Tokio codec for the length-prefixed RCP1 wire format.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::core::frame::{Frame, HEADER_SIZE, MAX_FRAME_SIZE};
use crate::error::ProtocolError;

/// Encoder/decoder for [`Frame`]s over a byte stream.
///
/// Decoding is incremental: `decode` returns `Ok(None)` until the full
/// length prefix and the full declared payload have arrived, so a frame is
/// either returned whole or not at all. A stream that ends mid-frame fails
/// with [`ProtocolError::IncompleteFrame`] rather than yielding a short
/// payload.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameCodec;

impl FrameCodec {
    /// Create a codec.
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, ProtocolError> {
        if src.len() < HEADER_SIZE {
            src.reserve(HEADER_SIZE - src.len());
            return Ok(None);
        }

        let mut prefix = [0u8; HEADER_SIZE];
        prefix.copy_from_slice(&src[..HEADER_SIZE]);
        let length = u32::from_be_bytes(prefix) as usize;

        if length > MAX_FRAME_SIZE {
            return Err(ProtocolError::OversizedFrame(length));
        }

        if src.len() < HEADER_SIZE + length {
            src.reserve(HEADER_SIZE + length - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let payload = src.split_to(length).freeze();
        Ok(Some(Frame { payload }))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, ProtocolError> {
        match self.decode(buf)? {
            Some(frame) => Ok(Some(frame)),
            None if buf.is_empty() => Ok(None),
            None => {
                let expected = if buf.len() >= HEADER_SIZE {
                    let mut prefix = [0u8; HEADER_SIZE];
                    prefix.copy_from_slice(&buf[..HEADER_SIZE]);
                    HEADER_SIZE + u32::from_be_bytes(prefix) as usize
                } else {
                    HEADER_SIZE
                };
                Err(ProtocolError::IncompleteFrame {
                    expected,
                    got: buf.len(),
                })
            }
        }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        // Reject before touching the buffer so no partial frame is ever written.
        if frame.payload.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::OversizedFrame(frame.payload.len()));
        }

        dst.reserve(frame.wire_size());
        dst.put_u32(frame.payload.len() as u32);
        dst.put_slice(&frame.payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn encode_writes_prefix_then_payload() {
        let mut buf = BytesMut::new();
        FrameCodec::new()
            .encode(Frame::new(Bytes::from_static(b"AB")), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], &[0, 0, 0, 2, 0x41, 0x42]);
    }

    #[test]
    fn decode_waits_for_full_prefix() {
        let mut buf = BytesMut::from(&[0u8, 0, 0][..]);
        assert!(FrameCodec::new().decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn decode_waits_for_full_payload() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&[0u8, 0, 0, 4, 1, 2][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&[3, 4]);
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame.payload[..], &[1, 2, 3, 4]);
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_handles_empty_payload() {
        let mut buf = BytesMut::from(&[0u8, 0, 0, 0][..]);
        let frame = FrameCodec::new().decode(&mut buf).unwrap().unwrap();
        assert!(frame.is_empty());
    }

    #[test]
    fn decode_rejects_oversized_prefix() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&((MAX_FRAME_SIZE as u32) + 1).to_be_bytes());
        let err = FrameCodec::new().decode(&mut buf).unwrap_err();
        assert!(matches!(err, ProtocolError::OversizedFrame(_)));
    }

    #[test]
    fn eof_mid_frame_is_incomplete() {
        let mut buf = BytesMut::from(&[0u8, 0, 0, 10, 1, 2, 3][..]);
        let err = FrameCodec::new().decode_eof(&mut buf).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::IncompleteFrame {
                expected: 14,
                got: 7
            }
        ));
    }

    #[test]
    fn eof_on_clean_boundary_is_fine() {
        let mut buf = BytesMut::new();
        assert!(FrameCodec::new().decode_eof(&mut buf).unwrap().is_none());
    }
}
