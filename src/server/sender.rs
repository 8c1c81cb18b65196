//! Outbound commands to named peripherals
//!
//! Sending is best effort. A peripheral that is not connected is an ordinary
//! situation (the user pressed something before the device paired), so it is
//! reported as [`SendOutcome::Absent`] and never as an error. A failed write is
//! logged and left for the connection's read loop to clean up.

use std::sync::Arc;

use crate::protocol::thresholds::Thresholds;
use crate::registry::ClientRegistry;

/// Result of a send attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Line written and flushed
    Sent,
    /// No open connection under that name
    Absent,
    /// Connection found but the write failed
    WriteFailed,
}

impl SendOutcome {
    /// Check if the line was written
    pub fn is_sent(&self) -> bool {
        *self == SendOutcome::Sent
    }
}

/// Writes lines to peripherals by name
#[derive(Debug, Clone)]
pub struct OutboundSender {
    registry: Arc<ClientRegistry>,
}

impl OutboundSender {
    /// Create a sender over `registry`
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self { registry }
    }

    /// Send `message` followed by a newline to the peripheral `name`
    pub async fn send(&self, name: &str, message: &str) -> SendOutcome {
        let Some(connection) = self.registry.get(name).await else {
            tracing::debug!(peripheral = name, message = message, "Peripheral not connected, dropping message");
            return SendOutcome::Absent;
        };

        if !connection.is_open() {
            tracing::debug!(peripheral = name, message = message, "Peripheral closing, dropping message");
            return SendOutcome::Absent;
        }

        match connection.write_line(message).await {
            Ok(()) => {
                tracing::debug!(peripheral = name, session_id = connection.id(), message = message, "Sent");
                SendOutcome::Sent
            }
            Err(e) => {
                tracing::warn!(
                    peripheral = name,
                    session_id = connection.id(),
                    error = %e,
                    "Failed to send message"
                );
                SendOutcome::WriteFailed
            }
        }
    }

    /// Send a threshold update to the peripheral `name`
    pub async fn send_thresholds(&self, name: &str, thresholds: &Thresholds) -> SendOutcome {
        self.send(name, &thresholds.to_line()).await
    }

    /// The registry this sender reads from
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }
}
