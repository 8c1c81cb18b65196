//! UDP frame receiver
//!
//! Owns the video socket and runs the receive loop on its own task. Completed
//! frames go out through a `watch` channel, so only the latest frame is ever
//! pending: a slow consumer skips frames instead of stalling the socket.
//!
//! ```text
//!   camera ──► UdpSocket ──► FrameAssembler ──► watch::Sender<Option<CompletedFrame>>
//!                                                       │
//!                                           subscribe() ┴─► image sink
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use super::assembler::FrameAssembler;
use super::config::ReceiverConfig;
use super::frame::CompletedFrame;
use crate::error::{Error, Result};
use crate::stats::ReassemblyStats;

/// Pause after a failed receive so a persistent error does not spin
const RECV_BACKOFF: Duration = Duration::from_millis(10);

/// Receives fragmented frames over UDP
pub struct FrameReassembler {
    config: ReceiverConfig,
    frames: Arc<watch::Sender<Option<CompletedFrame>>>,
    stats: Arc<watch::Sender<ReassemblyStats>>,
    task: Mutex<Option<JoinHandle<()>>>,
    local_addr: std::sync::Mutex<Option<SocketAddr>>,
}

impl FrameReassembler {
    /// Create a receiver; nothing is bound until [`start`](Self::start)
    pub fn new(config: ReceiverConfig) -> Self {
        let (frames, _) = watch::channel(None);
        let (stats, _) = watch::channel(ReassemblyStats::default());

        Self {
            config,
            frames: Arc::new(frames),
            stats: Arc::new(stats),
            task: Mutex::new(None),
            local_addr: std::sync::Mutex::new(None),
        }
    }

    /// Get the receiver configuration
    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    /// Bind the socket and start the receive loop
    ///
    /// Returns the bound address. A bind failure is returned as-is and never
    /// retried.
    pub async fn start(&self) -> Result<SocketAddr> {
        let mut task = self.task.lock().await;
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return Err(Error::AlreadyRunning);
        }

        let addr = self.config.bind_addr;
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;
        socket
            .set_broadcast(self.config.broadcast)
            .map_err(|source| Error::Bind { addr, source })?;
        let local_addr = socket.local_addr()?;

        tracing::info!(addr = %local_addr, "Frame receiver listening");

        *self.lock_local_addr() = Some(local_addr);
        *task = Some(tokio::spawn(receive_loop(
            socket,
            self.config.max_datagram_size,
            Arc::clone(&self.frames),
            Arc::clone(&self.stats),
        )));

        Ok(local_addr)
    }

    /// Stop the receive loop and close the socket
    ///
    /// Safe to call repeatedly or before `start`.
    pub async fn stop(&self) {
        let handle = self.task.lock().await.take();

        if let Some(handle) = handle {
            handle.abort();
            // Wait for the task to drop the socket
            let _ = handle.await;
            tracing::info!(stats = ?self.stats(), "Frame receiver stopped");
        }

        *self.lock_local_addr() = None;
    }

    /// Subscribe to completed frames
    ///
    /// The receiver always sees the most recent frame; intermediate frames
    /// are skipped if it falls behind.
    pub fn subscribe(&self) -> watch::Receiver<Option<CompletedFrame>> {
        self.frames.subscribe()
    }

    /// Subscribe to reassembly counters
    pub fn subscribe_stats(&self) -> watch::Receiver<ReassemblyStats> {
        self.stats.subscribe()
    }

    /// Current reassembly counters
    pub fn stats(&self) -> ReassemblyStats {
        self.stats.borrow().clone()
    }

    /// Bound address while running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.lock_local_addr()
    }

    fn lock_local_addr(&self) -> std::sync::MutexGuard<'_, Option<SocketAddr>> {
        self.local_addr.lock().unwrap_or_else(|e| e.into_inner())
    }
}

async fn receive_loop(
    socket: UdpSocket,
    max_datagram_size: usize,
    frames: Arc<watch::Sender<Option<CompletedFrame>>>,
    stats: Arc<watch::Sender<ReassemblyStats>>,
) {
    let mut assembler = FrameAssembler::new();
    let mut buf = vec![0u8; max_datagram_size];

    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, peer)) => {
                tracing::trace!(peer = %peer, len = len, "Datagram received");

                let datagram = Bytes::copy_from_slice(&buf[..len]);
                if let Some(frame) = assembler.push_datagram(datagram) {
                    frames.send_replace(Some(frame));
                }
                stats.send_replace(assembler.stats().clone());
            }
            Err(e) => recv_failed(&e).await,
        }
    }
}

async fn recv_failed(error: &std::io::Error) {
    tracing::warn!(error = %error, "Failed to receive datagram");
    tokio::time::sleep(RECV_BACKOFF).await;
}
