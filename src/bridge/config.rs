//! Bridge configuration

use std::net::{Ipv4Addr, SocketAddr};

use crate::media::ReceiverConfig;
use crate::router::RouterConfig;
use crate::server::ServerConfig;

/// Configuration for every part of the bridge
#[derive(Debug, Clone, Default)]
pub struct BridgeConfig {
    /// TCP control channel
    pub server: ServerConfig,

    /// UDP video channel
    pub receiver: ReceiverConfig,

    /// Alarm rules
    pub router: RouterConfig,
}

impl BridgeConfig {
    /// Set the TCP server configuration
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.server = server;
        self
    }

    /// Set the UDP receiver configuration
    pub fn receiver(mut self, receiver: ReceiverConfig) -> Self {
        self.receiver = receiver;
        self
    }

    /// Set the router configuration
    pub fn router(mut self, router: RouterConfig) -> Self {
        self.router = router;
        self
    }

    /// Bind both channels on loopback with OS-assigned ports
    pub fn loopback() -> Self {
        let any = SocketAddr::from((Ipv4Addr::LOCALHOST, 0));

        Self {
            server: ServerConfig::with_addr(any),
            receiver: ReceiverConfig::with_addr(any),
            router: RouterConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        let config = BridgeConfig::default();

        assert_eq!(config.server.bind_addr.port(), 8080);
        assert_eq!(config.receiver.bind_addr.port(), 44444);
        assert_eq!(config.router, RouterConfig::default());
    }

    #[test]
    fn test_loopback() {
        let config = BridgeConfig::loopback();

        assert!(config.server.bind_addr.ip().is_loopback());
        assert_eq!(config.server.bind_addr.port(), 0);
        assert_eq!(config.receiver.bind_addr.port(), 0);
    }
}
