//! # Session Port
//!
//! Handlers never touch sockets. They see a connection through [`Session`]:
//! an identity plus a non-blocking send primitive that queues one encoded
//! frame. Sends on one session are delivered in call order.

use bytes::Bytes;
use necromancy_core::{ConnectionId, NecroError, Result};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

/// A live client session as seen by opcode handlers
pub trait Session: Send + Sync {
    /// Identifier of this session within its listener
    fn id(&self) -> ConnectionId;

    /// Remote address, when the session is backed by a socket
    fn peer_addr(&self) -> Option<SocketAddr>;

    /// Queue an encoded frame for transmission
    ///
    /// Returning `Ok` does not mean the bytes reached the peer.
    ///
    /// # Errors
    /// `Network` if the session is already closed.
    fn send_frame(&self, frame: Bytes) -> Result<()>;
}

/// In-memory session that records every frame sent through it
///
/// Used by handler tests and tooling that drive an endpoint without a socket.
pub struct RecordingSession {
    id: ConnectionId,
    sent: Mutex<Vec<Bytes>>,
    closed: AtomicBool,
}

impl RecordingSession {
    pub fn new(id: ConnectionId) -> Self {
        Self {
            id,
            sent: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// All frames sent so far, in order
    pub fn sent_frames(&self) -> Vec<Bytes> {
        self.sent.lock().clone()
    }

    /// Reject any further sends
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Session for RecordingSession {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }

    fn send_frame(&self, frame: Bytes) -> Result<()> {
        if self.is_closed() {
            return Err(NecroError::Network(format!("session {} closed", self.id)));
        }
        self.sent.lock().push(frame);
        Ok(())
    }
}
