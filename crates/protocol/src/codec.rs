//! Stream framing for `tokio_util::codec`
//!
//! TCP delivers arbitrary chunks; [`FrameCodec`] reassembles them into whole
//! raw frames (header included) using the big-endian size field.

use crate::frame::SIZE_FIELD_LEN;
use bytes::{Bytes, BytesMut};
use necromancy_core::NecroError;
use tokio_util::codec::{Decoder, Encoder};

/// Length-prefixed frame codec
///
/// # Decoding
/// Waits for the 2-byte size, then for `2 + size` bytes, and yields that many
/// bytes untouched. A size below 2 still yields a (short) frame so the handler
/// can report it; the stream stays aligned either way.
///
/// At end of stream, leftover bytes that never completed a frame are yielded
/// as a final chunk instead of being discarded silently.
///
/// # Encoding
/// Frames are encoded before they reach the transport (the packet log must see
/// the exact outbound bytes), so encoding is a pass-through.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec;

impl FrameCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for FrameCodec {
    type Item = BytesMut;
    type Error = NecroError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < SIZE_FIELD_LEN {
            return Ok(None);
        }

        let size = u16::from_be_bytes([src[0], src[1]]) as usize;
        let frame_len = SIZE_FIELD_LEN + size;

        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        Ok(Some(src.split_to(frame_len)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Ok(Some(src.split())),
        }
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = NecroError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&item);
        Ok(())
    }
}
