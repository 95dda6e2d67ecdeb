//! # Login Endpoint Messages
//!
//! Payload structures for the login handshake. Each structure reads from a
//! [`PacketReader`] positioned at the start of the payload and writes into a
//! [`PacketWriter`] (the header is added by the send path).

use crate::codecs::{PacketReader, PacketWriter};
use necromancy_core::Result;

/// Client version handshake (`0x0557`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientVersion {
    pub minor: u32,
    pub major: u32,
}

impl ClientVersion {
    pub fn decode(reader: &mut PacketReader<'_>) -> Result<Self> {
        let minor = reader.read_u32_le()?;
        let major = reader.read_u32_le()?;
        Ok(Self { minor, major })
    }

    pub fn encode(&self, writer: &mut PacketWriter) {
        writer.write_u32_le(self.minor).write_u32_le(self.major);
    }
}

/// World selection reply (`0x8C84`)
///
/// The client is pointed at the world server through two address strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectWorld {
    /// 0 on success
    pub result: i32,
    pub primary_address: String,
    pub secondary_address: String,
}

impl SelectWorld {
    pub fn new(primary_address: impl Into<String>, secondary_address: impl Into<String>) -> Self {
        Self {
            result: 0,
            primary_address: primary_address.into(),
            secondary_address: secondary_address.into(),
        }
    }

    pub fn encode(&self, writer: &mut PacketWriter) {
        writer
            .write_i32_le(self.result)
            .write_cstring(&self.primary_address)
            .write_cstring(&self.secondary_address);
    }

    pub fn decode(reader: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            result: reader.read_i32_le()?,
            primary_address: reader.read_cstring()?,
            secondary_address: reader.read_cstring()?,
        })
    }
}

/// Credential submission (`0x93AD`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticate {
    pub account_name: String,
    pub password: String,
    pub mac_address: String,
    /// Trailing field of unknown meaning
    pub unknown: u16,
}

impl Authenticate {
    pub fn decode(reader: &mut PacketReader<'_>) -> Result<Self> {
        let account_name = reader.read_cstring()?;
        let password = reader.read_cstring()?;
        let mac_address = reader.read_cstring()?;
        let unknown = reader.read_u16_le()?;
        Ok(Self {
            account_name,
            password,
            mac_address,
            unknown,
        })
    }

    pub fn encode(&self, writer: &mut PacketWriter) {
        writer
            .write_cstring(&self.account_name)
            .write_cstring(&self.password)
            .write_cstring(&self.mac_address)
            .write_u16_le(self.unknown);
    }
}

/// Credential submission reply (`0xEFDD`)
///
/// Three little-endian integers whose meaning is not known. The only payload
/// ever observed is `0, 1, 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticateReply {
    pub fields: [i32; 3],
}

impl Default for AuthenticateReply {
    fn default() -> Self {
        Self { fields: [0, 1, 0] }
    }
}

impl AuthenticateReply {
    pub fn encode(&self, writer: &mut PacketWriter) {
        for field in self.fields {
            writer.write_i32_le(field);
        }
    }
}
