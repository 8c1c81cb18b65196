//! Session state machine
//!
//! Tracks one peripheral connection from accept to close and decides what
//! each received line means.
//!
//! ```text
//!   AwaitingHandshake ──IAM:<name>──► Registered ──EOF/error──► Closed
//!          │                              │
//!          └─ other lines: dropped        └─ lines: ControlEvent
//! ```

use std::net::SocketAddr;
use std::time::Instant;

use crate::protocol::handshake::{is_handshake, parse_handshake};
use crate::protocol::line::ControlEvent;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Connected, no valid handshake yet
    AwaitingHandshake,
    /// Named and registered
    Registered,
    /// Read loop finished
    Closed,
}

/// Why a line was not turned into an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Line arrived before a valid handshake
    BeforeHandshake(String),
    /// Blank line
    Empty,
    /// Line over the length limit; carries the bytes discarded
    TooLong(usize),
    /// A second `IAM:` on an already named connection
    RepeatedHandshake,
    /// Session already closed
    Closed,
}

/// What the connection task should do with a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineAction {
    /// Handshake accepted: register under this name
    Register(String),
    /// Publish this event
    Publish(ControlEvent),
    /// Discard the line
    Drop(DropReason),
}

/// Complete session state
#[derive(Debug)]
pub struct SessionState {
    /// Unique session ID
    pub id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Current phase
    pub phase: SessionPhase,

    /// Name from the handshake
    name: Option<String>,

    /// Connection start time
    pub connected_at: Instant,

    /// Time when the handshake completed
    pub registered_at: Option<Instant>,

    /// Lines turned into events
    pub lines_received: u64,

    /// Lines discarded
    pub lines_dropped: u64,
}

impl SessionState {
    /// Create a new session state
    pub fn new(id: u64, peer_addr: SocketAddr) -> Self {
        Self {
            id,
            peer_addr,
            phase: SessionPhase::AwaitingHandshake,
            name: None,
            connected_at: Instant::now(),
            registered_at: None,
            lines_received: 0,
            lines_dropped: 0,
        }
    }

    /// Handle one received line
    pub fn on_line(&mut self, line: &str) -> LineAction {
        let action = self.classify(line);

        match action {
            LineAction::Drop(_) => self.lines_dropped += 1,
            _ => self.lines_received += 1,
        }

        action
    }

    /// Account for a line that was discarded for its length
    pub fn on_oversized(&mut self, len: usize) -> LineAction {
        self.lines_dropped += 1;
        LineAction::Drop(DropReason::TooLong(len))
    }

    fn classify(&mut self, line: &str) -> LineAction {
        if line.trim().is_empty() {
            return LineAction::Drop(DropReason::Empty);
        }

        match self.phase {
            SessionPhase::AwaitingHandshake => match parse_handshake(line) {
                Ok(name) => {
                    let name = name.to_string();
                    self.name = Some(name.clone());
                    self.phase = SessionPhase::Registered;
                    self.registered_at = Some(Instant::now());
                    LineAction::Register(name)
                }
                Err(_) => LineAction::Drop(DropReason::BeforeHandshake(line.to_string())),
            },
            SessionPhase::Registered if is_handshake(line) => {
                LineAction::Drop(DropReason::RepeatedHandshake)
            }
            SessionPhase::Registered => {
                LineAction::Publish(ControlEvent::decode(self.name.as_deref(), line))
            }
            SessionPhase::Closed => LineAction::Drop(DropReason::Closed),
        }
    }

    /// Name from the handshake, if completed
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Check if the handshake completed
    pub fn is_registered(&self) -> bool {
        self.phase == SessionPhase::Registered
    }

    /// Mark the session closed
    pub fn close(&mut self) {
        self.phase = SessionPhase::Closed;
    }

    /// Get session duration
    pub fn duration(&self) -> std::time::Duration {
        self.connected_at.elapsed()
    }
}
