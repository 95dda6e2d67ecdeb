//! # Opcode Routing
//!
//! Each endpoint owns an [`OpcodeTable`]: a map from opcode to handler built
//! once and read-only afterwards. [`PacketRouter`] holds the behaviour shared
//! by every endpoint:
//!
//! ```text
//! raw frame → packet log (IN) → decode header → table lookup
//!     found     → handler(context, payload reader) → send → packet log (OUT) → session
//!     not found → error log, nothing sent, connection stays open
//!     bad frame → error log, frame dropped, connection stays open
//! ```
//!
//! # Thread Safety
//!
//! Tables are shared across connection tasks behind `Arc`. Handlers take `&self`
//! state only; anything mutable must bring its own synchronization.
//!
//! # Example
//!
//! ```no_run
//! use necromancy_network::OpcodeTable;
//! use necromancy_protocol::PacketWriter;
//!
//! let mut table = OpcodeTable::new();
//! table.register_function(0x0001, |ctx, reader| {
//!     let mut reply = PacketWriter::new();
//!     reply.write_bytes(reader.rest());
//!     ctx.send(0x0002, &reply)
//! });
//! ```

use crate::session::Session;
use necromancy_core::{Direction, Endpoint, LogLevel, LogSink, Result};
use necromancy_protocol::{decode_header, encode_frame, log_frame, FrameHeader, PacketReader, PacketWriter};
use std::collections::HashMap;
use std::sync::Arc;

/// Type for opcode handler functions
///
/// Handlers run synchronously on the connection task and may send any number
/// of frames through the context.
pub type HandlerFunction =
    Arc<dyn Fn(&PacketContext<'_>, &mut PacketReader<'_>) -> Result<()> + Send + Sync>;

/// Everything a handler can see about the frame it is handling
pub struct PacketContext<'a> {
    /// Session the frame arrived on
    pub session: &'a dyn Session,

    /// Endpoint that received the frame
    pub endpoint: Endpoint,

    /// Header as decoded from the wire
    pub header: FrameHeader,

    sink: &'a dyn LogSink,
}

impl<'a> PacketContext<'a> {
    /// Frame and send a payload on the current session
    pub fn send(&self, opcode: u16, payload: &PacketWriter) -> Result<()> {
        send_frame(self.session, self.sink, self.endpoint, opcode, payload.as_bytes())
    }

    /// Write an operational record tagged with the endpoint name
    pub fn log(&self, level: LogLevel, message: &str) {
        self.sink.write(level, self.endpoint.name(), message);
    }
}

/// Frame, log and queue one outbound message
///
/// The packet record is built from the encoded bytes, so the log always shows
/// exactly what is handed to the transport.
pub fn send_frame(
    session: &dyn Session,
    sink: &dyn LogSink,
    endpoint: Endpoint,
    opcode: u16,
    payload: &[u8],
) -> Result<()> {
    let frame = encode_frame(opcode, payload)?;
    log_frame(sink, Direction::Out, endpoint.name(), &frame);
    session.send_frame(frame)
}

/// Mapping from opcode to handler
///
/// # Performance
/// O(1) dispatch via direct HashMap lookup.
#[derive(Default, Clone)]
pub struct OpcodeTable {
    handlers: HashMap<u16, HandlerFunction>,
}

impl OpcodeTable {
    /// Create an empty table
    #[inline]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a function-based handler
    ///
    /// Registering the same opcode twice replaces the earlier handler.
    pub fn register_function<F>(&mut self, opcode: u16, handler: F)
    where
        F: Fn(&PacketContext<'_>, &mut PacketReader<'_>) -> Result<()> + Send + Sync + 'static,
    {
        tracing::debug!("Registered handler for opcode: 0x{:04X}", opcode);
        self.handlers.insert(opcode, Arc::new(handler));
    }

    /// Look up the handler for an opcode
    pub fn get(&self, opcode: u16) -> Option<&HandlerFunction> {
        self.handlers.get(&opcode)
    }

    /// Check if a handler is registered for an opcode
    pub fn has_handler(&self, opcode: u16) -> bool {
        self.handlers.contains_key(&opcode)
    }

    /// Get the number of registered handlers
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Registered opcodes in ascending order
    pub fn opcodes(&self) -> Vec<u16> {
        let mut opcodes: Vec<u16> = self.handlers.keys().copied().collect();
        opcodes.sort_unstable();
        opcodes
    }
}

/// Outcome of routing one inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A handler ran to completion
    Handled(u16),

    /// No handler is bound to this opcode
    Unrecognized(u16),

    /// The frame could not be decoded, or its handler failed
    Dropped,
}

/// Connection lifecycle callbacks every endpoint variant implements
///
/// The transport guarantees that calls for one session never overlap.
pub trait EndpointHandler: Send + Sync + 'static {
    /// Which endpoint this handler serves
    fn endpoint(&self) -> Endpoint;

    /// A client connected
    fn on_connected(&self, session: &dyn Session);

    /// The client is gone; the session can no longer send
    fn on_disconnected(&self, session: &dyn Session);

    /// One raw frame arrived
    fn on_received_data(&self, session: &dyn Session, data: &[u8]) -> Dispatch;
}

/// Shared receive/dispatch/send logic, one instance per endpoint
pub struct PacketRouter {
    endpoint: Endpoint,
    table: OpcodeTable,
    sink: Arc<dyn LogSink>,
}

impl PacketRouter {
    pub fn new(endpoint: Endpoint, table: OpcodeTable, sink: Arc<dyn LogSink>) -> Self {
        Self {
            endpoint,
            table,
            sink,
        }
    }

    fn log(&self, level: LogLevel, message: &str) {
        self.sink.write(level, self.endpoint.name(), message);
    }

    /// Record a new session
    pub fn connected(&self, session: &dyn Session) {
        match session.peer_addr() {
            Some(addr) => self.log(
                LogLevel::Info,
                &format!("Client Connected (connection {}, {})", session.id(), addr),
            ),
            None => self.log(
                LogLevel::Info,
                &format!("Client Connected (connection {})", session.id()),
            ),
        }
    }

    /// Record the end of a session
    pub fn disconnected(&self, session: &dyn Session) {
        self.log(
            LogLevel::Info,
            &format!("Client Disconnected (connection {})", session.id()),
        );
    }

    /// Log, decode and dispatch one inbound frame
    pub fn route(&self, session: &dyn Session, data: &[u8]) -> Dispatch {
        log_frame(self.sink.as_ref(), Direction::In, self.endpoint.name(), data);

        let (header, payload) = match decode_header(data) {
            Ok(decoded) => decoded,
            Err(e) => {
                self.log(
                    LogLevel::Error,
                    &format!("Dropped frame from connection {}: {}", session.id(), e),
                );
                return Dispatch::Dropped;
            }
        };

        let Some(handler) = self.table.get(header.opcode) else {
            self.log(
                LogLevel::Error,
                &format!("OPCode: 0x{:04X} not handled", header.opcode),
            );
            return Dispatch::Unrecognized(header.opcode);
        };

        let context = PacketContext {
            session,
            endpoint: self.endpoint,
            header,
            sink: self.sink.as_ref(),
        };
        let mut reader = PacketReader::new(payload);

        match handler(&context, &mut reader) {
            Ok(()) => Dispatch::Handled(header.opcode),
            Err(e) => {
                self.log(
                    LogLevel::Error,
                    &format!(
                        "OPCode: 0x{:04X} from connection {} failed: {}",
                        header.opcode,
                        session.id(),
                        e
                    ),
                );
                Dispatch::Dropped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::RecordingSession;
    use necromancy_core::{ConnectionId, MemorySink};
    use necromancy_protocol::encode_frame;

    fn echo_router(sink: Arc<MemorySink>) -> PacketRouter {
        let mut table = OpcodeTable::new();
        table.register_function(0x0001, |ctx, reader| {
            let mut reply = PacketWriter::new();
            reply.write_bytes(reader.rest());
            ctx.send(0x0002, &reply)
        });
        table.register_function(0x0003, |_ctx, reader| {
            reader.read_i32_le()?;
            Ok(())
        });
        PacketRouter::new(Endpoint::World, table, sink)
    }

    #[test]
    fn test_table_register() {
        let mut table = OpcodeTable::new();
        table.register_function(0x93AD, |_ctx, _reader| Ok(()));
        table.register_function(0x0557, |_ctx, _reader| Ok(()));

        assert!(table.has_handler(0x0557));
        assert!(!table.has_handler(0x8C84));
        assert_eq!(table.handler_count(), 2);
        assert_eq!(table.opcodes(), vec![0x0557, 0x93AD]);
    }

    #[test]
    fn test_route_handled() {
        let sink = Arc::new(MemorySink::new());
        let router = echo_router(sink.clone());
        let session = RecordingSession::new(ConnectionId::new(1));

        let frame = encode_frame(0x0001, b"ping").unwrap();
        assert_eq!(router.route(&session, &frame), Dispatch::Handled(0x0001));

        let sent = session.sent_frames();
        assert_eq!(sent.len(), 1);
        assert_eq!(&sent[0][..], &encode_frame(0x0002, b"ping").unwrap()[..]);

        let records = sink.records();
        assert_eq!(records[0].tag, "IN");
        assert_eq!(records[1].tag, "OUT");
        assert!(records[1].message.contains("[World][Type:OUT][TotalSize:8]"));
    }

    #[test]
    fn test_route_unrecognized() {
        let sink = Arc::new(MemorySink::new());
        let router = echo_router(sink.clone());
        let session = RecordingSession::new(ConnectionId::new(1));

        let frame = encode_frame(0xFFFF, &[]).unwrap();
        assert_eq!(router.route(&session, &frame), Dispatch::Unrecognized(0xFFFF));
        assert!(session.sent_frames().is_empty());

        let errors = sink.with_tag("World");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].level, LogLevel::Error);
        assert_eq!(errors[0].message, "OPCode: 0xFFFF not handled");
    }

    #[test]
    fn test_route_truncated_header() {
        let sink = Arc::new(MemorySink::new());
        let router = echo_router(sink.clone());
        let session = RecordingSession::new(ConnectionId::new(4));

        assert_eq!(router.route(&session, &[0x00, 0x02, 0x00]), Dispatch::Dropped);
        assert_eq!(router.route(&session, &[0xFF, 0xFF, 0x00, 0x01]), Dispatch::Dropped);
        assert!(session.sent_frames().is_empty());

        // Inbound record is still written for the malformed frame
        assert_eq!(sink.with_tag("IN").len(), 2);
        assert_eq!(sink.with_tag("World").len(), 2);
    }

    #[test]
    fn test_route_handler_error() {
        let sink = Arc::new(MemorySink::new());
        let router = echo_router(sink.clone());
        let session = RecordingSession::new(ConnectionId::new(2));

        let frame = encode_frame(0x0003, &[1, 2]).unwrap();
        assert_eq!(router.route(&session, &frame), Dispatch::Dropped);

        let errors = sink.with_tag("World");
        assert!(errors[0].message.contains("Truncated frame"));
    }

    #[test]
    fn test_send_on_closed_session() {
        let sink = Arc::new(MemorySink::new());
        let router = echo_router(sink.clone());
        let session = RecordingSession::new(ConnectionId::new(3));
        session.close();

        let frame = encode_frame(0x0001, b"x").unwrap();
        assert_eq!(router.route(&session, &frame), Dispatch::Dropped);
    }

    #[test]
    fn test_send_frame_size_field() {
        let sink = MemorySink::new();
        let session = RecordingSession::new(ConnectionId::new(1));
        let mut payload = PacketWriter::new();
        payload.write_cstring("127.0.0.1").write_cstring("127.0.0.1");

        send_frame(&session, &sink, Endpoint::Login, 0x8C84, payload.as_bytes()).unwrap();

        let frame = &session.sent_frames()[0];
        assert_eq!(u16::from_be_bytes([frame[0], frame[1]]), 22);
        assert_eq!(u16::from_be_bytes([frame[2], frame[3]]), 0x8C84);
        assert_eq!(frame.len(), 24);
    }
}
