//! Payload field codecs
//!
//! Payload integers are little-endian (the header is the only big-endian part
//! of a frame). Strings are C-strings: raw bytes followed by one `0x00`.

use bytes::{Buf, BufMut, BytesMut};
use necromancy_core::{NecroError, Result};

/// Cursor over a frame payload
///
/// Every read checks the remaining length first; a short payload surfaces as
/// `TruncatedFrame`, never as a panic.
#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    #[inline]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed so far
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(NecroError::TruncatedFrame {
                needed: len,
                available: self.remaining(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?.get_u8())
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        Ok(self.take(2)?.get_u16_le())
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(self.take(4)?.get_u32_le())
    }

    pub fn read_i32_le(&mut self) -> Result<i32> {
        Ok(self.take(4)?.get_i32_le())
    }

    /// Read a null-terminated string
    ///
    /// The terminator is consumed but not returned. Bytes that are not valid
    /// UTF-8 are replaced rather than rejected; credentials are logged, not trusted.
    ///
    /// # Errors
    /// `UnterminatedString` if no `0x00` occurs before the end of the payload.
    pub fn read_cstring(&mut self) -> Result<String> {
        let rest = &self.buf[self.pos..];
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(NecroError::UnterminatedString { offset: self.pos })?;

        let text = String::from_utf8_lossy(&rest[..nul]).into_owned();
        self.pos += nul + 1;
        Ok(text)
    }

    /// Everything not yet consumed
    pub fn rest(&mut self) -> &'a [u8] {
        let rest = &self.buf[self.pos..];
        self.pos = self.buf.len();
        rest
    }
}

/// Response buffer used to assemble a payload before framing
#[derive(Debug, Clone, Default)]
pub struct PacketWriter {
    buf: BytesMut,
}

impl PacketWriter {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u16_le(&mut self, val: u16) -> &mut Self {
        self.buf.put_u16_le(val);
        self
    }

    pub fn write_u32_le(&mut self, val: u32) -> &mut Self {
        self.buf.put_u32_le(val);
        self
    }

    pub fn write_i32_le(&mut self, val: i32) -> &mut Self {
        self.buf.put_i32_le(val);
        self
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.put_slice(bytes);
        self
    }

    /// Write a string followed by a single null terminator
    ///
    /// An embedded `\0` would end the string early on the reading side, so the
    /// text is cut at the first one.
    pub fn write_cstring(&mut self, val: &str) -> &mut Self {
        let bytes = val.as_bytes();
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        self.buf.put_slice(&bytes[..end]);
        self.buf.put_u8(0);
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_integers() {
        let mut w = PacketWriter::new();
        w.write_i32_le(-2).write_u16_le(0x1234).write_u32_le(7);
        assert_eq!(
            w.as_bytes(),
            &[0xFE, 0xFF, 0xFF, 0xFF, 0x34, 0x12, 0x07, 0x00, 0x00, 0x00]
        );

        let mut r = PacketReader::new(w.as_bytes());
        assert_eq!(r.read_i32_le().unwrap(), -2);
        assert_eq!(r.read_u16_le().unwrap(), 0x1234);
        assert_eq!(r.read_u32_le().unwrap(), 7);
        assert!(r.is_empty());
    }

    #[test]
    fn test_cstring_consumes_terminator() {
        let data = b"alice\0secret\0\x05\x00";
        let mut r = PacketReader::new(data);
        assert_eq!(r.read_cstring().unwrap(), "alice");
        assert_eq!(r.position(), 6);
        assert_eq!(r.read_cstring().unwrap(), "secret");
        assert_eq!(r.read_u16_le().unwrap(), 5);
    }

    #[test]
    fn test_empty_cstring() {
        let mut r = PacketReader::new(b"\0x\0");
        assert_eq!(r.read_cstring().unwrap(), "");
        assert_eq!(r.read_cstring().unwrap(), "x");
    }

    #[test]
    fn test_unterminated_cstring() {
        let mut r = PacketReader::new(b"ab\0cd");
        r.read_cstring().unwrap();
        let err = r.read_cstring().unwrap_err();
        assert!(matches!(err, NecroError::UnterminatedString { offset: 3 }));
        // A failed read leaves the cursor where it was
        assert_eq!(r.remaining(), 2);
    }

    #[test]
    fn test_short_read_is_truncated() {
        let mut r = PacketReader::new(&[1, 2, 3]);
        let err = r.read_i32_le().unwrap_err();
        assert!(matches!(err, NecroError::TruncatedFrame { needed: 4, available: 3 }));
    }

    #[test]
    fn test_write_cstring_cuts_at_nul() {
        let mut w = PacketWriter::new();
        w.write_cstring("127.0.0.1");
        assert_eq!(w.len(), 10);
        assert_eq!(w.as_bytes().last(), Some(&0));

        let mut w = PacketWriter::new();
        w.write_cstring("a\0b");
        assert_eq!(w.as_bytes(), b"a\0");
    }

    #[test]
    fn test_rest_drains_reader() {
        let mut r = PacketReader::new(&[9, 8, 7]);
        r.read_u8().unwrap();
        assert_eq!(r.rest(), &[8, 7]);
        assert!(r.is_empty());
    }
}
