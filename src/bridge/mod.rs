//! The assembled bridge
//!
//! ```text
//!                       ┌────────────────── PeripheralBridge ──────────────────┐
//!   peripherals ─TCP──► │ PeripheralServer ──► CommandRouter ──► subscribe_events │
//!              ◄─TCP─── │       ▲ registry ◄── OutboundSender ◄── send_command   │
//!   camera ─────UDP──►  │ FrameReassembler ──────────────────► subscribe_frames  │
//!                       └──────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod service;

pub use config::BridgeConfig;
pub use service::{BoundAddrs, PeripheralBridge};
