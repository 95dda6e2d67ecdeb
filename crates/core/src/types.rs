//! Core type definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection ID (32-bit unsigned), unique per listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub u32);

impl ConnectionId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl From<u32> for ConnectionId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logical server endpoint
///
/// Both endpoints share the same framing but own disjoint opcode tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    /// Authentication server
    Login,
    /// Gameplay server
    World,
}

impl Endpoint {
    /// Name used in log records and tags
    pub fn name(&self) -> &'static str {
        match self {
            Self::Login => "Login",
            Self::World => "World",
        }
    }

    /// Port the official client connects to
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Login => 60000,
            Self::World => 12849,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Direction of a frame relative to this process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    /// Tag attached to packet log records
    pub fn tag(&self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
        }
    }
}
