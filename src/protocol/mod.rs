//! Peripheral wire protocols
//!
//! - [`handshake`]: the `IAM:<name>` line that binds a TCP connection to a name
//! - [`line`]: tagged control lines and their decoded [`ControlEvent`] form
//! - [`thresholds`]: ultrasonic threshold settings
//! - [`fragment`]: the 4-byte header of UDP video fragments

pub mod constants;
pub mod fragment;
pub mod handshake;
pub mod line;
pub mod thresholds;

pub use fragment::{split_frame, FrameFragment};
pub use handshake::{handshake_line, is_handshake, parse_handshake};
pub use line::{ControlEvent, EventTag};
pub use thresholds::Thresholds;
