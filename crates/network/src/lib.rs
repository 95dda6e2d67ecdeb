//! # Necromancy Networking Layer
//!
//! This crate provides Tokio-based async networking shared by the login and
//! world endpoints.
//!
//! ## Modules
//!
//! - [`config`] - Listener configuration options
//! - [`session`] - The `Session` port handlers send through
//! - [`connection`] - Individual connection management
//! - [`handlers`] - Opcode tables, routing and the send path
//! - [`server`] - Endpoint listener

pub mod config;
pub mod connection;
pub mod handlers;
pub mod server;
pub mod session;

// Re-export commonly used items
pub use config::ListenerConfig;
pub use connection::{Connection, ConnectionState};
pub use handlers::{
    send_frame, Dispatch, EndpointHandler, HandlerFunction, OpcodeTable, PacketContext,
    PacketRouter,
};
pub use server::{EndpointListener, ListenerStats};
pub use session::{RecordingSession, Session};
