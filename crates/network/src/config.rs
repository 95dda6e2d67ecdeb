//! # Listener Configuration
//!
//! Configuration options for one endpoint listener.
//!
//! # Example
//!
//! ```rust
//! use necromancy_core::Endpoint;
//! use necromancy_network::ListenerConfig;
//!
//! let config = ListenerConfig {
//!     max_connections: 200,
//!     ..ListenerConfig::for_endpoint(Endpoint::Login)
//! };
//! assert_eq!(config.bind_address.port(), 60000);
//! ```

use necromancy_core::Endpoint;
use std::net::{Ipv4Addr, SocketAddr};

/// Listener configuration options
///
/// # Default Values
/// - Bind `0.0.0.0:60000` (login port, all interfaces)
/// - 1000 max connections
/// - 8KB read buffer
/// - Nagle disabled
/// - 1024 queued outbound frames per connection
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Address and port to bind the TCP listener to
    ///
    /// # Examples
    /// - `0.0.0.0:60000` - Listen on all interfaces
    /// - `127.0.0.1:0` - Localhost, ephemeral port (tests)
    pub bind_address: SocketAddr,

    /// Maximum number of concurrent connections allowed
    ///
    /// Connections accepted past this limit are closed immediately.
    pub max_connections: usize,

    /// Initial capacity of each connection's read buffer
    ///
    /// The buffer grows on demand up to one full frame (64KB + 2).
    pub read_buffer_size: usize,

    /// Set `TCP_NODELAY` on accepted sockets
    pub nodelay: bool,

    /// Frames a connection may have queued for writing
    ///
    /// Sends beyond this fail until the peer reads, so a stalled client
    /// cannot grow the queue without limit.
    pub outbound_queue_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self::for_endpoint(Endpoint::Login)
    }
}

impl ListenerConfig {
    /// Defaults for an endpoint, bound on all interfaces at its standard port
    pub fn for_endpoint(endpoint: Endpoint) -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, endpoint.default_port())),
            max_connections: 1000,
            read_buffer_size: 8192,
            nodelay: true,
            outbound_queue_size: 1024,
        }
    }

    /// Validate the configuration
    ///
    /// # Checks
    /// - `max_connections` must be > 0
    /// - `read_buffer_size` must be >= 1024
    /// - `outbound_queue_size` must be > 0
    pub fn validate(&self) -> Result<(), String> {
        if self.max_connections == 0 {
            return Err("max_connections must be > 0".to_string());
        }

        if self.read_buffer_size < 1024 {
            return Err("read_buffer_size must be >= 1024".to_string());
        }

        if self.outbound_queue_size == 0 {
            return Err("outbound_queue_size must be > 0".to_string());
        }

        if !self.read_buffer_size.is_power_of_two() {
            tracing::warn!("read_buffer_size is not a power of 2, this may reduce performance");
        }

        Ok(())
    }
}
