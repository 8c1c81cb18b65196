//! Per-connection session state

pub mod state;

pub use state::{DropReason, LineAction, SessionPhase, SessionState};
