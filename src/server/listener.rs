//! Peripheral server listener
//!
//! Handles the TCP accept loop and spawns connection handlers. Connection
//! tasks live in a `JoinSet` owned by the accept task, so aborting the accept
//! task tears every connection down with it.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

use crate::error::{Error, Result};
use crate::protocol::line::ControlEvent;
use crate::registry::{ClientRegistry, PeripheralConnection};
use crate::server::config::ServerConfig;
use crate::server::connection::Connection;
use crate::stats::{ServerCounters, ServerStats};

/// Pause after a failed accept so a persistent error does not spin
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// TCP server for named peripherals
pub struct PeripheralServer {
    config: ServerConfig,
    registry: Arc<ClientRegistry>,
    events: broadcast::Sender<ControlEvent>,
    counters: Arc<ServerCounters>,
    next_session_id: Arc<AtomicU64>,
    connection_semaphore: Option<Arc<Semaphore>>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    local_addr: std::sync::Mutex<Option<SocketAddr>>,
}

impl PeripheralServer {
    /// Create a new server with its own registry
    pub fn new(config: ServerConfig) -> Self {
        Self::with_registry(config, Arc::new(ClientRegistry::new()))
    }

    /// Create a new server sharing an existing registry
    pub fn with_registry(config: ServerConfig, registry: Arc<ClientRegistry>) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        let (events, _) = broadcast::channel(config.event_capacity);

        Self {
            config,
            registry,
            events,
            counters: Arc::new(ServerCounters::default()),
            next_session_id: Arc::new(AtomicU64::new(1)),
            connection_semaphore,
            accept_task: Mutex::new(None),
            local_addr: std::sync::Mutex::new(None),
        }
    }

    /// Get a reference to the client registry
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Subscribe to events from all connections
    pub fn subscribe(&self) -> broadcast::Receiver<ControlEvent> {
        self.events.subscribe()
    }

    /// Connection and line counters
    pub fn stats(&self) -> ServerStats {
        self.counters.snapshot()
    }

    /// Bound address while running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.lock_local_addr()
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Bind the listener and start accepting
    ///
    /// Returns the bound address. Fails with [`Error::Bind`] if the address
    /// is unavailable and with [`Error::AlreadyRunning`] if already started.
    pub async fn start(&self) -> Result<SocketAddr> {
        let mut task = self.accept_task.lock().await;
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return Err(Error::AlreadyRunning);
        }

        let addr = self.config.bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        tracing::info!(addr = %local_addr, "Peripheral server listening");

        let acceptor = Acceptor {
            listener,
            config: self.config.clone(),
            registry: Arc::clone(&self.registry),
            events: self.events.clone(),
            counters: Arc::clone(&self.counters),
            next_session_id: Arc::clone(&self.next_session_id),
            connection_semaphore: self.connection_semaphore.clone(),
        };

        *self.lock_local_addr() = Some(local_addr);
        *task = Some(tokio::spawn(acceptor.run()));

        Ok(local_addr)
    }

    /// Stop accepting and close every connection
    ///
    /// Safe to call repeatedly or before `start`.
    pub async fn stop(&self) {
        let handle = self.accept_task.lock().await.take();

        if let Some(handle) = handle {
            handle.abort();
            // Wait for the listener and the connection set to drop
            let _ = handle.await;
        }

        for connection in self.registry.clear().await {
            connection.close().await;
        }

        if self.lock_local_addr().take().is_some() {
            tracing::info!(stats = ?self.stats(), "Peripheral server stopped");
        }
    }

    fn lock_local_addr(&self) -> std::sync::MutexGuard<'_, Option<SocketAddr>> {
        self.local_addr.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// State moved into the accept task
struct Acceptor {
    listener: TcpListener,
    config: ServerConfig,
    registry: Arc<ClientRegistry>,
    events: broadcast::Sender<ControlEvent>,
    counters: Arc<ServerCounters>,
    next_session_id: Arc<AtomicU64>,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl Acceptor {
    async fn run(self) {
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((socket, peer_addr)) => {
                        self.handle_connection(&mut connections, socket, peer_addr);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }
    }

    fn handle_connection(
        &self,
        connections: &mut JoinSet<()>,
        socket: TcpStream,
        peer_addr: SocketAddr,
    ) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    self.counters.connection_rejected();
                    return;
                }
            }
        } else {
            None
        };

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(session_id = session_id, peer = %peer_addr, "New connection");

        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(session_id = session_id, error = %e, "Failed to configure socket");
            return;
        }

        self.counters.connection_opened();
        let guard = ActiveGuard {
            counters: Arc::clone(&self.counters),
            _permit: permit,
        };

        let (reader, writer) = socket.into_split();
        let handle = Arc::new(PeripheralConnection::new(session_id, peer_addr, writer));
        let mut connection = Connection::new(
            reader,
            handle,
            &self.config,
            Arc::clone(&self.registry),
            self.events.clone(),
            Arc::clone(&self.counters),
        );

        connections.spawn(async move {
            let _guard = guard;

            if let Err(e) = connection.run().await {
                tracing::debug!(session_id = session_id, error = %e, "Connection error");
            }

            tracing::debug!(session_id = session_id, "Connection closed");
        });
    }

    fn configure_socket(&self, socket: &TcpStream) -> std::io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }

        Ok(())
    }
}

/// Keeps the active count and the connection slot for one task
struct ActiveGuard {
    counters: Arc<ServerCounters>,
    _permit: Option<OwnedSemaphorePermit>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.counters.connection_closed();
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};

    use super::*;
    use crate::protocol::line::EventTag;

    fn loopback_config() -> ServerConfig {
        ServerConfig::with_addr("127.0.0.1:0".parse().unwrap())
    }

    async fn next_event(rx: &mut broadcast::Receiver<ControlEvent>) -> ControlEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for event")
            .unwrap()
    }

    #[tokio::test]
    async fn test_handshake_and_event_flow() {
        let server = PeripheralServer::new(loopback_config());
        let addr = server.start().await.unwrap();
        let mut rx = server.subscribe();

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"IAM:ULTRASONIC\nULTRASONIC:DANGER\n").await.unwrap();

        assert_eq!(next_event(&mut rx).await, ControlEvent::iam("ULTRASONIC"));
        let reading = next_event(&mut rx).await;
        assert_eq!(reading.tag(), EventTag::Ultrasonic);
        assert_eq!(reading.source(), Some("ULTRASONIC"));
        assert!(reading.is_reading("DANGER"));

        drop(client);
        assert_eq!(next_event(&mut rx).await, ControlEvent::disconnected("ULTRASONIC"));
        assert!(server.registry().is_empty().await);

        server.stop().await;
    }

    #[tokio::test]
    async fn test_outbound_write_reaches_peer() {
        let server = PeripheralServer::new(loopback_config());
        let addr = server.start().await.unwrap();
        let mut rx = server.subscribe();

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"IAM:BUTTON\n").await.unwrap();
        next_event(&mut rx).await;

        let conn = server.registry().get("BUTTON").await.unwrap();
        conn.write_line("ALARM_ON").await.unwrap();

        let mut reader = BufReader::new(client);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(line, "ALARM_ON\n");

        server.stop().await;
    }

    #[tokio::test]
    async fn test_bind_failure() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = occupied.local_addr().unwrap();

        let server = PeripheralServer::new(ServerConfig::with_addr(addr));
        assert!(matches!(server.start().await, Err(Error::Bind { .. })));
    }

    #[tokio::test]
    async fn test_start_twice() {
        let server = PeripheralServer::new(loopback_config());
        server.start().await.unwrap();

        assert!(matches!(server.start().await, Err(Error::AlreadyRunning)));
        server.stop().await;
    }

    #[tokio::test]
    async fn test_stop_closes_connections() {
        let server = PeripheralServer::new(loopback_config());
        let addr = server.start().await.unwrap();
        let mut rx = server.subscribe();

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"IAM:CAMERA\n").await.unwrap();
        next_event(&mut rx).await;

        server.stop().await;
        server.stop().await;

        assert!(server.registry().is_empty().await);
        assert_eq!(server.local_addr(), None);

        let mut buf = [0u8; 8];
        let read = tokio::time::timeout(Duration::from_secs(2), client.read(&mut buf))
            .await
            .expect("peer was not closed");
        assert!(matches!(read, Ok(0) | Err(_)));

        // Port is free again
        TcpListener::bind(addr).await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let server = PeripheralServer::new(loopback_config().max_connections(1));
        let addr = server.start().await.unwrap();
        let mut rx = server.subscribe();

        let mut first = TcpStream::connect(addr).await.unwrap();
        first.write_all(b"IAM:BUTTON\n").await.unwrap();
        next_event(&mut rx).await;

        let mut second = TcpStream::connect(addr).await.unwrap();
        let mut buf = [0u8; 8];
        let read = tokio::time::timeout(Duration::from_secs(2), second.read(&mut buf))
            .await
            .expect("rejected peer was not closed");
        assert!(matches!(read, Ok(0) | Err(_)));

        let stats = server.stats();
        assert_eq!(stats.rejected_connections, 1);
        assert_eq!(stats.active_connections, 1);

        server.stop().await;
    }

    #[tokio::test]
    async fn test_silent_peer_releases_slot() {
        let config = loopback_config()
            .max_connections(1)
            .connection_timeout(Duration::from_millis(100));
        let server = PeripheralServer::new(config);
        let addr = server.start().await.unwrap();
        let mut rx = server.subscribe();

        let mut silent = TcpStream::connect(addr).await.unwrap();
        let mut buf = [0u8; 8];
        let read = tokio::time::timeout(Duration::from_secs(2), silent.read(&mut buf))
            .await
            .expect("silent peer was not closed");
        assert!(matches!(read, Ok(0) | Err(_)));

        // Give the task time to drop its slot after closing the socket
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut named = TcpStream::connect(addr).await.unwrap();
        named.write_all(b"IAM:BUTTON\n").await.unwrap();
        assert_eq!(next_event(&mut rx).await, ControlEvent::iam("BUTTON"));
        assert_eq!(server.stats().rejected_connections, 0);

        server.stop().await;
    }
}
