//! # Necromancy Endpoint Logic
//!
//! The two endpoint variants and their opcode handlers.
//!
//! ## Modules
//!
//! - `login` - Version handshake and credential submission
//! - `world` - Gameplay endpoint (no opcodes handled yet)

pub mod login;
pub mod world;

// Re-export commonly used types
pub use login::{LoginOptions, LoginServer};
pub use world::WorldServer;
