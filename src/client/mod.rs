//! Peripheral-side clients
//!
//! Provides the device end of both channels for:
//! - Simulating peripherals in demos and tests
//! - Driving a bridge from tools that stand in for real hardware

pub mod camera;
pub mod peripheral;

pub use camera::CameraStreamer;
pub use peripheral::PeripheralClient;
