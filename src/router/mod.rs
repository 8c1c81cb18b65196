//! Command routing
//!
//! ```text
//!   connection tasks ──► broadcast ──► CommandRouter ──► broadcast ──► subscribers
//!                                          │
//!                                          └─ ALARM_ON / ALARM_OFF ──► OutboundSender
//! ```

pub mod config;
pub mod dispatch;

pub use config::RouterConfig;
pub use dispatch::{Command, CommandRouter, Route};
