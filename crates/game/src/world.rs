//! # World Endpoint
//!
//! Accepts gameplay connections. No gameplay opcode is handled yet, so every
//! frame is logged and reported as unhandled.

use necromancy_core::{Endpoint, LogSink};
use necromancy_network::{Dispatch, EndpointHandler, OpcodeTable, PacketRouter, Session};
use std::sync::Arc;

/// World endpoint handler
pub struct WorldServer {
    router: PacketRouter,
}

impl WorldServer {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            router: PacketRouter::new(Endpoint::World, Self::opcode_table(), sink),
        }
    }

    /// Build the world opcode table
    pub fn opcode_table() -> OpcodeTable {
        OpcodeTable::new()
    }
}

impl EndpointHandler for WorldServer {
    fn endpoint(&self) -> Endpoint {
        Endpoint::World
    }

    fn on_connected(&self, session: &dyn Session) {
        self.router.connected(session);
    }

    fn on_disconnected(&self, session: &dyn Session) {
        self.router.disconnected(session);
    }

    fn on_received_data(&self, session: &dyn Session, data: &[u8]) -> Dispatch {
        self.router.route(session, data)
    }
}
