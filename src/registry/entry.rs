//! Peripheral connection handle
//!
//! One per accepted TCP connection. The connection task owns the read half;
//! this handle owns the write half and is what the registry shares with the
//! outbound sender.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::protocol::constants::LINE_TERMINATOR;

/// Write side of a peripheral transport
pub type PeripheralWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// An active connection to a hardware peripheral
pub struct PeripheralConnection {
    /// Unique session ID
    id: u64,

    /// Remote peer address
    peer_addr: SocketAddr,

    /// Name from the handshake (unset until then)
    name: OnceLock<String>,

    /// Write half; `None` once closed
    writer: Mutex<Option<PeripheralWriter>>,

    /// Cleared when the read loop ends
    open: AtomicBool,

    /// When the connection was accepted
    connected_at: Instant,
}

impl PeripheralConnection {
    /// Wrap the write half of a new connection
    pub fn new(id: u64, peer_addr: SocketAddr, writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            id,
            peer_addr,
            name: OnceLock::new(),
            writer: Mutex::new(Some(Box::new(writer))),
            open: AtomicBool::new(true),
            connected_at: Instant::now(),
        }
    }

    /// Session ID
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remote peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Name assigned by the handshake
    pub fn name(&self) -> Option<&str> {
        self.name.get().map(String::as_str)
    }

    /// Assign the handshake name; only the first assignment sticks
    pub(crate) fn set_name(&self, name: &str) -> bool {
        self.name.set(name.to_string()).is_ok()
    }

    /// Check whether the connection is still open
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Time since the connection was accepted
    pub fn duration(&self) -> std::time::Duration {
        self.connected_at.elapsed()
    }

    /// Write one line followed by the line terminator
    pub async fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut guard = self.writer.lock().await;
        let writer = guard
            .as_mut()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotConnected))?;

        let mut buf = String::with_capacity(line.len() + LINE_TERMINATOR.len());
        buf.push_str(line);
        buf.push_str(LINE_TERMINATOR);

        writer.write_all(buf.as_bytes()).await?;
        writer.flush().await
    }

    /// Mark closed and shut down the write half
    pub async fn close(&self) {
        self.open.store(false, Ordering::Release);

        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(e) = writer.shutdown().await {
                tracing::debug!(session_id = self.id, error = %e, "Error shutting down transport");
            }
        }
    }
}

impl std::fmt::Debug for PeripheralConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeripheralConnection")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("name", &self.name())
            .field("open", &self.is_open())
            .finish()
    }
}
