//! Frame reassembly rule
//!
//! Feeds decoded fragments into the single [`FrameBuffer`] and decides when a
//! frame is complete. Newest frame id wins: a fragment for any other id
//! abandons whatever was in progress. Nothing is ever re-requested, so a frame
//! that loses a fragment is simply never emitted.

use bytes::Bytes;

use super::buffer::{FrameBuffer, Insert};
use super::frame::CompletedFrame;
use crate::protocol::fragment::FrameFragment;
use crate::stats::ReassemblyStats;

/// Turns fragments into completed frames
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buffer: FrameBuffer,
    stats: ReassemblyStats,
}

impl FrameAssembler {
    /// Create an assembler with an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters since creation
    pub fn stats(&self) -> &ReassemblyStats {
        &self.stats
    }

    /// The in-progress frame state
    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    /// Decode and process one raw datagram
    ///
    /// Datagrams shorter than the header are counted and skipped.
    pub fn push_datagram(&mut self, datagram: Bytes) -> Option<CompletedFrame> {
        self.stats.datagrams += 1;

        match FrameFragment::decode(datagram) {
            Ok(fragment) => self.push(fragment),
            Err(e) => {
                self.stats.malformed += 1;
                tracing::warn!(error = %e, "Ignoring datagram");
                None
            }
        }
    }

    /// Process one fragment, returning the frame it completes, if any
    pub fn push(&mut self, fragment: FrameFragment) -> Option<CompletedFrame> {
        let frame_id = fragment.frame_id;

        if !self.buffer.holds(frame_id) {
            if !self.buffer.is_empty() {
                self.stats.frames_abandoned += 1;
                tracing::debug!(
                    abandoned = ?self.buffer.frame_id(),
                    received = self.buffer.len(),
                    expected = self.buffer.expected(),
                    frame_id = frame_id,
                    "Newer frame started, abandoning incomplete frame"
                );
            }
            self.buffer.reset(frame_id, fragment.total);
        }

        if self.buffer.insert(fragment) == Insert::Duplicate {
            self.stats.duplicates += 1;
            tracing::trace!(frame_id = frame_id, "Duplicate fragment ignored");
            return None;
        }

        if !self.buffer.is_ready() {
            return None;
        }

        let result = self.buffer.concat();
        self.buffer.retire();

        match result {
            Ok(data) if data.is_empty() => {
                self.stats.frames_discarded += 1;
                tracing::warn!(frame_id = frame_id, "Frame assembled with no payload, discarding");
                None
            }
            Ok(data) => {
                self.stats.frames_completed += 1;
                self.stats.bytes_completed += data.len() as u64;
                tracing::debug!(frame_id = frame_id, size = data.len(), "Frame assembled");
                Some(CompletedFrame::new(frame_id, data))
            }
            Err(missing) => {
                self.stats.frames_discarded += 1;
                tracing::warn!(
                    frame_id = frame_id,
                    missing_index = missing,
                    "Frame is missing a fragment, discarding"
                );
                None
            }
        }
    }
}
