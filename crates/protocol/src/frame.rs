//! Frame header encoding and decoding
//!
//! The 4-byte header is big-endian. The size field counts the opcode and the
//! payload, never itself.

use bytes::{BufMut, Bytes, BytesMut};
use necromancy_core::{NecroError, Result};

/// Length of the size field
pub const SIZE_FIELD_LEN: usize = 2;

/// Length of the opcode field
pub const OPCODE_LEN: usize = 2;

/// Length of the full header (size + opcode)
pub const HEADER_LEN: usize = SIZE_FIELD_LEN + OPCODE_LEN;

/// Largest payload the 16-bit size field can describe
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize - OPCODE_LEN;

/// Decoded frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Declared size: opcode + payload length
    pub size: u16,

    /// Message type
    pub opcode: u16,
}

impl FrameHeader {
    /// Payload length implied by the declared size
    #[inline]
    pub fn payload_len(&self) -> usize {
        (self.size as usize).saturating_sub(OPCODE_LEN)
    }

    /// Total frame length on the wire, size field included
    #[inline]
    pub fn frame_len(&self) -> usize {
        SIZE_FIELD_LEN + self.size as usize
    }
}

/// Read the header fields without validating them against the buffer
///
/// Returns `None` when fewer than [`HEADER_LEN`] bytes are present.
#[inline]
pub fn peek_header(bytes: &[u8]) -> Option<FrameHeader> {
    if bytes.len() < HEADER_LEN {
        return None;
    }
    Some(FrameHeader {
        size: u16::from_be_bytes([bytes[0], bytes[1]]),
        opcode: u16::from_be_bytes([bytes[2], bytes[3]]),
    })
}

/// Decode a frame header and return the payload region
///
/// The returned slice is everything after the header. Opcode readers consume
/// what their schema needs from it; the declared size only has to fit inside
/// the buffer.
///
/// # Errors
/// - `TruncatedFrame` if fewer than 4 bytes are present
/// - `TruncatedFrame` if the declared size does not cover the opcode field
/// - `TruncatedFrame` if the declared size exceeds the bytes available
pub fn decode_header(bytes: &[u8]) -> Result<(FrameHeader, &[u8])> {
    let header = peek_header(bytes).ok_or(NecroError::TruncatedFrame {
        needed: HEADER_LEN,
        available: bytes.len(),
    })?;

    if (header.size as usize) < OPCODE_LEN {
        return Err(NecroError::TruncatedFrame {
            needed: OPCODE_LEN,
            available: header.size as usize,
        });
    }

    let end = header.frame_len();
    if bytes.len() < end {
        return Err(NecroError::TruncatedFrame {
            needed: end,
            available: bytes.len(),
        });
    }

    Ok((header, &bytes[HEADER_LEN..]))
}

/// Encode a complete frame: `size || opcode || payload`
///
/// # Errors
/// `FrameTooLarge` if the payload exceeds [`MAX_PAYLOAD_LEN`].
pub fn encode_frame(opcode: u16, payload: &[u8]) -> Result<Bytes> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(NecroError::FrameTooLarge(payload.len()));
    }

    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_u16((payload.len() + OPCODE_LEN) as u16);
    buf.put_u16(opcode);
    buf.put_slice(payload);
    Ok(buf.freeze())
}
