//! Host-side bridge for embedded peripherals
//!
//! Peripherals (buttons, an ultrasonic ranger, a camera) reach the host over
//! two channels:
//!
//! - **TCP control**: newline-delimited lines. Each connection names itself
//!   with `IAM:<name>` and is then addressable by that name.
//! - **UDP video**: JPEG frames split into datagrams with a 4-byte header
//!   (frame id, fragment index, fragment count), reassembled on the host.
//!
//! ```text
//!   ┌────────────┐  IAM:ULTRASONIC / DANGER   ┌──────────────────┐
//!   │ ultrasonic │ ─────────────────────────► │                  │
//!   └────────────┘                            │                  │
//!   ┌────────────┐        ALARM_ON            │ PeripheralBridge │ ──► events
//!   │   button   │ ◄───────────────────────── │                  │
//!   └────────────┘                            │                  │
//!   ┌────────────┐   [id|idx|total|payload]   │                  │
//!   │   camera   │ ══════════ UDP ══════════► │                  │ ──► frames
//!   └────────────┘                            └──────────────────┘
//! ```
//!
//! # Example
//! ```no_run
//! use periph_bridge::{BridgeConfig, PeripheralBridge};
//!
//! # async fn example() -> periph_bridge::error::Result<()> {
//! let bridge = PeripheralBridge::new(BridgeConfig::default());
//! bridge.start().await?;
//!
//! let mut events = bridge.subscribe_events();
//! while let Ok(event) = events.recv().await {
//!     println!("{}", event);
//! }
//!
//! bridge.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod client;
pub mod error;
pub mod media;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod server;
pub mod session;
pub mod stats;

pub use bridge::{BoundAddrs, BridgeConfig, PeripheralBridge};
pub use error::{Error, ProtocolError, Result};
pub use media::{CompletedFrame, FrameReassembler, ReceiverConfig};
pub use protocol::{ControlEvent, EventTag, FrameFragment, Thresholds};
pub use registry::{ClientRegistry, PeripheralConnection};
pub use router::{CommandRouter, RouterConfig};
pub use server::{OutboundSender, PeripheralServer, SendOutcome, ServerConfig};
