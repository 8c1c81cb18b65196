//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::protocol::constants::DEFAULT_TCP_PORT;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Capacity of the inbound event channel; slower subscribers lag
    pub event_capacity: usize,

    /// Longest accepted line in bytes, terminator excluded; longer lines are dropped
    pub max_line_length: usize,

    /// Connection timeout (handshake must complete within this time)
    pub connection_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_TCP_PORT)),
            max_connections: 0, // Unlimited
            tcp_nodelay: true, // Commands are single short lines
            event_capacity: 256,
            max_line_length: 4 * 1024,
            connection_timeout: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the port, keeping the bind IP
    pub fn port(mut self, port: u16) -> Self {
        self.bind_addr.set_port(port);
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the event channel capacity (at least 1)
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Set the maximum line length (at least 1)
    pub fn max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max.max(1);
        self
    }

    /// Set the handshake deadline
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Leave Nagle's algorithm enabled
    pub fn disable_nodelay(mut self) -> Self {
        self.tcp_nodelay = false;
        self
    }
}
