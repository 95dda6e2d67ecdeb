//! # Packet Logging
//!
//! Renders raw frames as diagnostic records:
//!
//! ```text
//! Packet Log:
//! [Login][Type:IN][TotalSize:12] Header:[Size:10][OPCode:0x0557]
//! ------------------------------------------------------------
//! ............
//! 00 0A 05 57 01 00 00 00 02 00 00 00
//! ------------------------------------------------------------
//! ```
//!
//! The header fields are read again from the raw bytes so the record shows
//! exactly what crossed the wire. Malformed input never fails: missing header
//! fields are rendered as `?`.

use crate::frame::peek_header;
use necromancy_core::{Direction, LogLevel, LogSink};
use std::fmt::Write;

const SEPARATOR: &str = "------------------------------------------------------------";

/// Render bytes as uppercase hex pairs joined by `separator`
pub fn hex_dump(bytes: &[u8], separator: char) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(separator);
        }
        let _ = write!(out, "{:02X}", byte);
    }
    out
}

/// Render printable ASCII bytes as-is and everything else as `.`
pub fn ascii_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if (0x20..=0x7E).contains(&b) { b as char } else { '.' })
        .collect()
}

/// Build the full text of a packet record
pub fn format_frame(direction: Direction, endpoint_name: &str, raw: &[u8]) -> String {
    let size = match raw {
        [hi, lo, ..] => u16::from_be_bytes([*hi, *lo]).to_string(),
        _ => "?".to_string(),
    };
    let opcode = peek_header(raw)
        .map(|header| format!("0x{:04X}", header.opcode))
        .unwrap_or_else(|| "?".to_string());

    let mut out = String::with_capacity(256 + raw.len() * 4);
    out.push_str("Packet Log:\n");
    let _ = writeln!(
        out,
        "[{}][Type:{}][TotalSize:{}] Header:[Size:{}][OPCode:{}]",
        endpoint_name,
        direction.tag(),
        raw.len(),
        size,
        opcode
    );
    out.push_str(SEPARATOR);
    out.push('\n');
    out.push_str(&ascii_dump(raw));
    out.push('\n');
    out.push_str(&hex_dump(raw, ' '));
    out.push('\n');
    out.push_str(SEPARATOR);
    out
}

/// Write a packet record to the sink at debug level, tagged `IN` or `OUT`
pub fn log_frame(sink: &dyn LogSink, direction: Direction, endpoint_name: &str, raw: &[u8]) {
    sink.write(
        LogLevel::Debug,
        direction.tag(),
        &format_frame(direction, endpoint_name, raw),
    );
}
