//! # Necromancy Protocol Library
//!
//! Wire format shared by the login and world endpoints.
//!
//! ## Architecture
//!
//! ### 1. Framing ([`frame`], [`codec`])
//! Every message is a frame:
//!
//! ```text
//! Offset  Size  Field    Encoding
//! 0       2     size     big-endian u16 = 2 + payload length
//! 2       2     opcode   big-endian u16
//! 4       N     payload  opcode-specific
//! ```
//!
//! [`codec::FrameCodec`] cuts a TCP byte stream into whole frames.
//!
//! ### 2. Payload Codecs ([`codecs`])
//! Readers and writers for payload fields. Unlike the header, payload integers
//! are little-endian; strings are null-terminated.
//!
//! ### 3. Opcodes and Messages ([`packets`], [`login`])
//! Known opcodes and the structures carried by the login endpoint.
//!
//! ### 4. Packet Logging ([`packet_log`])
//! Hex + ASCII diagnostic records of raw frames.
//!
//! ## Usage Example
//!
//! ```rust
//! use necromancy_protocol::{decode_header, encode_frame, PacketWriter};
//!
//! let mut payload = PacketWriter::new();
//! payload.write_cstring("127.0.0.1");
//! let frame = encode_frame(0x8C84, payload.as_bytes()).unwrap();
//!
//! let (header, rest) = decode_header(&frame).unwrap();
//! assert_eq!(header.opcode, 0x8C84);
//! assert_eq!(rest, b"127.0.0.1\0");
//! ```

pub mod codec;
pub mod codecs;
pub mod frame;
pub mod login;
pub mod packet_log;
pub mod packets;

// Re-export commonly used items
pub use codec::*;
pub use codecs::*;
pub use frame::*;
pub use login::*;
pub use packet_log::*;
pub use packets::*;
