//! Frame receiver configuration

use std::net::{Ipv4Addr, SocketAddr};

use crate::protocol::constants::{DEFAULT_UDP_PORT, MAX_DATAGRAM_SIZE};

/// Frame receiver configuration options
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Address to bind the UDP socket to
    pub bind_addr: SocketAddr,

    /// Receive buffer per datagram; longer datagrams are truncated
    pub max_datagram_size: usize,

    /// Accept broadcast datagrams
    pub broadcast: bool,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_UDP_PORT)),
            max_datagram_size: MAX_DATAGRAM_SIZE,
            broadcast: true,
        }
    }
}

impl ReceiverConfig {
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

    /// Set the per-datagram receive buffer size
    pub fn max_datagram_size(mut self, size: usize) -> Self {
        self.max_datagram_size = size.max(crate::protocol::constants::FRAGMENT_HEADER_SIZE);
        self
    }

    /// Disable broadcast reception
    pub fn disable_broadcast(mut self) -> Self {
        self.broadcast = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReceiverConfig::default();

        assert_eq!(config.bind_addr.port(), 44444);
        assert_eq!(config.max_datagram_size, 1500);
        assert!(config.broadcast);
    }

    #[test]
    fn test_builder_chaining() {
        let config = ReceiverConfig::default()
            .port(5000)
            .max_datagram_size(2)
            .disable_broadcast();

        assert_eq!(config.bind_addr.port(), 5000);
        assert_eq!(config.max_datagram_size, 4);
        assert!(!config.broadcast);
    }
}
