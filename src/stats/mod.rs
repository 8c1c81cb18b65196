//! Statistics for the frame receiver and the peripheral server

pub mod metrics;

pub(crate) use metrics::ServerCounters;
pub use metrics::{ReassemblyStats, ServerStats};
