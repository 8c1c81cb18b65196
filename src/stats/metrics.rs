//! Counters for the frame receiver and the peripheral server

use std::sync::atomic::{AtomicU64, Ordering};

/// Frame reassembly counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReassemblyStats {
    /// Datagrams received, including malformed ones
    pub datagrams: u64,
    /// Datagrams shorter than the fragment header
    pub malformed: u64,
    /// Fragments ignored because their index was already held
    pub duplicates: u64,
    /// Frames emitted
    pub frames_completed: u64,
    /// In-progress frames dropped because a newer frame id arrived
    pub frames_abandoned: u64,
    /// Frames dropped at concatenation because an index was missing
    pub frames_discarded: u64,
    /// Payload bytes emitted in completed frames
    pub bytes_completed: u64,
}

impl ReassemblyStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fraction of started frames that completed
    pub fn completion_ratio(&self) -> f64 {
        let started = self.frames_completed + self.frames_abandoned + self.frames_discarded;
        if started == 0 {
            0.0
        } else {
            self.frames_completed as f64 / started as f64
        }
    }
}

/// Server-wide connection statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerStats {
    /// Connections accepted since start
    pub total_connections: u64,
    /// Connections currently open
    pub active_connections: u64,
    /// Connections turned away by the connection limit
    pub rejected_connections: u64,
    /// Lines published as events
    pub lines_received: u64,
    /// Lines dropped (before handshake, empty, repeated handshake)
    pub lines_dropped: u64,
}

impl ServerStats {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Live counters shared between the accept loop and connection tasks
#[derive(Debug, Default)]
pub(crate) struct ServerCounters {
    total_connections: AtomicU64,
    active_connections: AtomicU64,
    rejected_connections: AtomicU64,
    lines_received: AtomicU64,
    lines_dropped: AtomicU64,
}

impl ServerCounters {
    pub(crate) fn connection_opened(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn connection_rejected(&self) {
        self.rejected_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_lines(&self, received: u64, dropped: u64) {
        self.lines_received.fetch_add(received, Ordering::Relaxed);
        self.lines_dropped.fetch_add(dropped, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ServerStats {
        ServerStats {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            rejected_connections: self.rejected_connections.load(Ordering::Relaxed),
            lines_received: self.lines_received.load(Ordering::Relaxed),
            lines_dropped: self.lines_dropped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reassembly_stats_new() {
        let stats = ReassemblyStats::new();
        assert_eq!(stats.datagrams, 0);
        assert_eq!(stats.frames_completed, 0);
        assert_eq!(stats.completion_ratio(), 0.0);
    }

    #[test]
    fn test_completion_ratio() {
        let stats = ReassemblyStats {
            frames_completed: 3,
            frames_abandoned: 1,
            ..Default::default()
        };

        assert_eq!(stats.completion_ratio(), 0.75);
    }

    #[test]
    fn test_server_counters_snapshot() {
        let counters = ServerCounters::default();
        counters.connection_opened();
        counters.connection_opened();
        counters.connection_closed();
        counters.connection_rejected();
        counters.add_lines(5, 2);

        let stats = counters.snapshot();
        assert_eq!(stats.total_connections, 2);
        assert_eq!(stats.active_connections, 1);
        assert_eq!(stats.rejected_connections, 1);
        assert_eq!(stats.lines_received, 5);
        assert_eq!(stats.lines_dropped, 2);
    }
}
