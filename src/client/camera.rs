//! UDP camera streamer
//!
//! Splits each frame into header-prefixed datagrams and sends them to the
//! bridge's video port. There is no retransmission.

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::net::UdpSocket;

use crate::error::{Error, Result};
use crate::protocol::constants::{DEFAULT_MAX_FRAGMENT_PAYLOAD, FRAGMENT_HEADER_SIZE, MAX_DATAGRAM_SIZE};
use crate::protocol::fragment::split_frame;

/// Sends fragmented frames to one target
pub struct CameraStreamer {
    socket: UdpSocket,
    target: SocketAddr,
    next_frame_id: u16,
    max_payload: usize,
}

impl CameraStreamer {
    /// Bind a local socket for streaming to `target`
    pub async fn bind(local: SocketAddr, target: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| Error::Bind { addr: local, source })?;

        Ok(Self {
            socket,
            target,
            next_frame_id: 0,
            max_payload: DEFAULT_MAX_FRAGMENT_PAYLOAD,
        })
    }

    /// Set the payload bytes per datagram
    ///
    /// Clamped so a datagram never exceeds the receiver's limit.
    pub fn max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload.clamp(1, MAX_DATAGRAM_SIZE - FRAGMENT_HEADER_SIZE);
        self
    }

    /// Set the id the next frame is sent with
    pub fn starting_frame_id(mut self, frame_id: u16) -> Self {
        self.next_frame_id = frame_id;
        self
    }

    /// Local socket address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Fragment and send one frame
    ///
    /// Returns the frame id used. The id advances (wrapping) even when the
    /// frame is too large to send.
    pub async fn send_frame(&mut self, data: &Bytes) -> Result<u16> {
        let frame_id = self.next_frame_id;
        self.next_frame_id = self.next_frame_id.wrapping_add(1);

        let fragments = split_frame(frame_id, data, self.max_payload)?;
        for fragment in &fragments {
            self.socket.send_to(&fragment.encode(), self.target).await?;
        }

        tracing::trace!(
            frame_id = frame_id,
            size = data.len(),
            fragments = fragments.len(),
            "Frame sent"
        );

        Ok(frame_id)
    }
}
