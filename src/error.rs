//! Error types
//!
//! Bind failures are the only errors that reach a caller at startup. Everything
//! on a live connection or datagram is logged and absorbed where it happens.

use std::net::SocketAddr;

/// Crate-wide error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A listening socket could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// I/O error on an established socket
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed protocol data
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// `start` was called on a component that is already running
    #[error("already running")]
    AlreadyRunning,
}

/// Malformed line or datagram content
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    /// Datagram shorter than the fragment header
    #[error("datagram too short: {0} bytes")]
    ShortDatagram(usize),

    /// First line on a connection was not `IAM:<name>`
    #[error("expected handshake, got {0:?}")]
    MissingHandshake(String),

    /// Handshake carried an empty name
    #[error("handshake with empty peripheral name")]
    EmptyName,

    /// `THRESHOLDS:` payload could not be parsed
    #[error("malformed thresholds: {0:?}")]
    MalformedThresholds(String),

    /// Frame needs more fragments than the header can count
    #[error("frame of {size} bytes needs more than {max} fragments")]
    FrameTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
