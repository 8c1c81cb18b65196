//! Bridge service
//!
//! One explicitly constructed instance owns the TCP server, the UDP frame
//! receiver and the router task. Nothing is global: two bridges on different
//! ports can run in the same process.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;

use super::config::BridgeConfig;
use crate::error::{Error, Result};
use crate::media::{CompletedFrame, FrameReassembler};
use crate::protocol::line::ControlEvent;
use crate::protocol::thresholds::Thresholds;
use crate::registry::ClientRegistry;
use crate::router::CommandRouter;
use crate::server::{OutboundSender, PeripheralServer, SendOutcome};
use crate::stats::{ReassemblyStats, ServerStats};

/// Addresses the bridge is listening on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundAddrs {
    /// TCP control channel
    pub control: SocketAddr,
    /// UDP video channel
    pub video: SocketAddr,
}

/// Host side of the peripheral link
pub struct PeripheralBridge {
    server: PeripheralServer,
    receiver: FrameReassembler,
    router: Arc<CommandRouter>,
    sender: OutboundSender,
    router_task: Mutex<Option<JoinHandle<()>>>,
}

impl PeripheralBridge {
    /// Create a bridge; nothing is bound until [`start`](Self::start)
    pub fn new(config: BridgeConfig) -> Self {
        let registry = Arc::new(ClientRegistry::new());
        let sender = OutboundSender::new(Arc::clone(&registry));
        let router = Arc::new(CommandRouter::new(config.router, sender.clone()));

        Self {
            server: PeripheralServer::with_registry(config.server, registry),
            receiver: FrameReassembler::new(config.receiver),
            router,
            sender,
            router_task: Mutex::new(None),
        }
    }

    /// Bind both channels and start routing
    ///
    /// TCP is bound first. If the UDP bind fails the TCP side is stopped again
    /// and the error returned.
    pub async fn start(&self) -> Result<BoundAddrs> {
        let mut router_task = self.router_task.lock().await;
        if router_task.is_some() {
            return Err(Error::AlreadyRunning);
        }

        let control = self.server.start().await?;
        let video = match self.receiver.start().await {
            Ok(addr) => addr,
            Err(e) => {
                self.server.stop().await;
                return Err(e);
            }
        };

        *router_task = Some(Arc::clone(&self.router).spawn(self.server.subscribe()));

        tracing::info!(control = %control, video = %video, "Bridge started");

        Ok(BoundAddrs { control, video })
    }

    /// Stop routing and close every socket
    ///
    /// Safe to call repeatedly or before `start`.
    pub async fn shutdown(&self) {
        let handle = self.router_task.lock().await.take();

        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
        }

        self.server.stop().await;
        self.receiver.stop().await;
    }

    /// Subscribe to events after routing
    ///
    /// Alarm readings that were turned into commands are not included.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ControlEvent> {
        self.router.subscribe()
    }

    /// Subscribe to the latest reassembled frame
    pub fn subscribe_frames(&self) -> watch::Receiver<Option<CompletedFrame>> {
        self.receiver.subscribe()
    }

    /// Send a command line to a named peripheral
    pub async fn send_command(&self, name: &str, message: &str) -> SendOutcome {
        self.sender.send(name, message).await
    }

    /// Send threshold settings to a named peripheral
    pub async fn send_thresholds(&self, name: &str, thresholds: &Thresholds) -> SendOutcome {
        self.sender.send_thresholds(name, thresholds).await
    }

    /// Connected peripherals
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        self.server.registry()
    }

    /// Bound TCP address while running
    pub fn control_addr(&self) -> Option<SocketAddr> {
        self.server.local_addr()
    }

    /// Bound UDP address while running
    pub fn video_addr(&self) -> Option<SocketAddr> {
        self.receiver.local_addr()
    }

    /// TCP connection counters
    pub fn server_stats(&self) -> ServerStats {
        self.server.stats()
    }

    /// Frame reassembly counters
    pub fn reassembly_stats(&self) -> ReassemblyStats {
        self.receiver.stats()
    }
}
