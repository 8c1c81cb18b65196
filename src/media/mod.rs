//! Video frame reassembly
//!
//! The camera splits each frame into datagrams small enough for one UDP packet.
//! This module puts them back together:
//!
//! - [`FrameBuffer`]: fragments of the one frame in flight
//! - [`FrameAssembler`]: the newest-id-wins reassembly rule
//! - [`FrameReassembler`]: socket, receive task and frame subscription

pub mod assembler;
pub mod buffer;
pub mod config;
pub mod frame;
pub mod receiver;

pub use assembler::FrameAssembler;
pub use buffer::{FrameBuffer, Insert};
pub use config::ReceiverConfig;
pub use frame::CompletedFrame;
pub use receiver::FrameReassembler;
