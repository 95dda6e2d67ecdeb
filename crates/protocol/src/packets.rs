//! # Opcode Definitions
//!
//! Only the login handshake is mapped so far. Every other opcode on either
//! endpoint is recognized as unhandled by the router.
//!
//! Opcodes are 16-bit values written big-endian in the frame header.

/// Client-to-server opcodes on the login endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum LoginOpcodeIn {
    /// Client version handshake
    ///
    /// # Packet Format
    /// ```text
    /// {0x0557}{i32 LE minor}{i32 LE major}
    /// ```
    ClientVersion = 0x0557,

    /// Credential submission
    ///
    /// # Packet Format
    /// ```text
    /// {0x93AD}{CSTRING account}{CSTRING password}{CSTRING mac}{u16 LE unknown}
    /// ```
    Authenticate = 0x93AD,
}

impl LoginOpcodeIn {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0557 => Some(Self::ClientVersion),
            0x93AD => Some(Self::Authenticate),
            _ => None,
        }
    }

    #[inline]
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// Server-to-client opcodes on the login endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum LoginOpcodeOut {
    /// World selection reply, sent in answer to the version handshake
    ///
    /// # Packet Format
    /// ```text
    /// {0x8C84}{i32 LE result}{CSTRING address}{CSTRING address}
    /// ```
    SelectWorld = 0x8C84,

    /// Credential submission reply
    ///
    /// # Packet Format
    /// ```text
    /// {0xEFDD}{i32 LE}{i32 LE}{i32 LE}
    /// ```
    ///
    /// # Notes
    /// Field meanings are unknown; only sent when explicitly enabled.
    Authenticate = 0xEFDD,
}

impl LoginOpcodeOut {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x8C84 => Some(Self::SelectWorld),
            0xEFDD => Some(Self::Authenticate),
            _ => None,
        }
    }

    #[inline]
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}
