//! TCP side of the bridge
//!
//! Accepts peripheral connections, runs the handshake and line loop for each,
//! and writes commands back by name.

pub mod config;
pub(crate) mod connection;
pub(crate) mod lines;
pub mod listener;
pub mod sender;

pub use config::ServerConfig;
pub use listener::PeripheralServer;
pub use sender::{OutboundSender, SendOutcome};
