//! Necromancy Server Configuration
//!
//! Loads `serveroptions.txt`: one `key = value` option per line, `#` starts a
//! comment line. Options that are absent keep their defaults.

use necromancy_core::{Endpoint, NecroError, Result};
use std::fmt;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::str::FromStr;

/// Default location of the options file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/serveroptions.txt";

/// Where endpoint records are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSinkKind {
    /// Forward records to the `tracing` subscriber
    Tracing,
    /// Write records straight to stdout
    Console,
}

impl FromStr for LogSinkKind {
    type Err = NecroError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "tracing" => Ok(Self::Tracing),
            "console" => Ok(Self::Console),
            _ => Err(NecroError::Config(format!("Unknown log sink: {}", value))),
        }
    }
}

impl fmt::Display for LogSinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tracing => f.write_str("tracing"),
            Self::Console => f.write_str("console"),
        }
    }
}

/// Server configuration from serveroptions.txt
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Interface both endpoints bind to (from "serverinterface", `AUTO` = all interfaces)
    pub server_interface: String,
    /// Login endpoint port (from "loginport", default: 60000)
    pub login_port: u16,
    /// World endpoint port (from "worldport", default: 12849)
    pub world_port: u16,
    /// Connection limit per endpoint (from "maxconnections")
    pub max_connections: usize,
    /// First address in the select-world reply (from "worldip")
    pub world_ip: String,
    /// Second address in the select-world reply (from "worldip2")
    pub world_ip2: String,
    /// Answer credential submissions (from "sendloginresponse")
    pub send_login_response: bool,
    /// Endpoint record destination (from "logsink")
    pub log_sink: LogSinkKind,
    /// Default tracing filter when RUST_LOG is unset (from "loglevel")
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_interface: "AUTO".into(),
            login_port: Endpoint::Login.default_port(),
            world_port: Endpoint::World.default_port(),
            max_connections: 1000,
            world_ip: "127.0.0.1".into(),
            world_ip2: "127.0.0.1".into(),
            send_login_response: false,
            log_sink: LogSinkKind::Tracing,
            log_level: "info".into(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a serveroptions.txt file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            NecroError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Load configuration from [`DEFAULT_CONFIG_PATH`]
    pub fn load_default() -> Result<Self> {
        Self::load_from_file(DEFAULT_CONFIG_PATH)
    }

    /// Parse serveroptions.txt content
    ///
    /// Unknown keys are logged and ignored; a value that does not parse for
    /// its key is an error.
    pub fn parse(content: &str) -> Result<Self> {
        let mut config = Self::default();

        for (index, line) in content.lines().enumerate() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match line.split_once('=') {
                Some((key, value)) => config.parse_option(&key.trim().to_lowercase(), value.trim())?,
                None => tracing::warn!("serveroptions line {} has no '=': {}", index + 1, line),
            }
        }

        config.interface_ip()?;
        Ok(config)
    }

    fn parse_option(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "serverinterface" => self.server_interface = value.into(),
            "loginport" => self.login_port = parse_value(key, value)?,
            "worldport" => self.world_port = parse_value(key, value)?,
            "maxconnections" => self.max_connections = parse_value(key, value)?,
            "worldip" => self.world_ip = value.into(),
            "worldip2" => self.world_ip2 = value.into(),
            "sendloginresponse" => self.send_login_response = parse_value(key, value)?,
            "logsink" => self.log_sink = value.parse()?,
            "loglevel" => self.log_level = value.to_lowercase(),
            _ => tracing::warn!("Unknown config option: {} = {}", key, value),
        }
        Ok(())
    }

    /// Interface address, with `AUTO` meaning all interfaces
    pub fn interface_ip(&self) -> Result<IpAddr> {
        if self.server_interface.eq_ignore_ascii_case("AUTO") {
            return Ok(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        }

        self.server_interface.parse().map_err(|_| {
            NecroError::Config(format!("Invalid serverinterface: {}", self.server_interface))
        })
    }

    /// Port configured for an endpoint
    pub fn port(&self, endpoint: Endpoint) -> u16 {
        match endpoint {
            Endpoint::Login => self.login_port,
            Endpoint::World => self.world_port,
        }
    }

    /// Bind address for an endpoint's listener
    pub fn bind_address(&self, endpoint: Endpoint) -> Result<SocketAddr> {
        Ok(SocketAddr::new(self.interface_ip()?, self.port(endpoint)))
    }

    /// Bind address for the login listener
    pub fn login_address(&self) -> Result<SocketAddr> {
        self.bind_address(Endpoint::Login)
    }

    /// Bind address for the world listener
    pub fn world_address(&self) -> Result<SocketAddr> {
        self.bind_address(Endpoint::World)
    }

    /// Display configuration summary
    pub fn display(&self) {
        tracing::info!("Server configuration:");
        tracing::info!("  Interface: {}", self.server_interface);
        tracing::info!("  Login port: {}", self.login_port);
        tracing::info!("  World port: {}", self.world_port);
        tracing::info!("  Max connections: {}", self.max_connections);
        tracing::info!("  World addresses: {} / {}", self.world_ip, self.world_ip2);
        tracing::info!("  Send login response: {}", self.send_login_response);
        tracing::info!("  Log sink: {} (level {})", self.log_sink, self.log_level);
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| NecroError::Config(format!("Invalid value for {}: {}", key, value)))
}
