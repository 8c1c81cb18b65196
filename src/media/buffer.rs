//! Reassembly state for the single in-flight frame
//!
//! Holds the fragments received so far for one frame id. All entries belong to
//! that id; switching ids clears the map first. No I/O happens here.

use std::collections::HashMap;

use bytes::{Bytes, BytesMut};

use crate::protocol::fragment::FrameFragment;

/// Result of inserting a fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insert {
    /// Payload stored
    Stored,
    /// Index already held, payload ignored
    Duplicate,
}

/// Fragments of the frame currently being assembled
#[derive(Debug, Default)]
pub struct FrameBuffer {
    /// Frame id being assembled (None before the first fragment)
    frame_id: Option<u16>,
    /// Fragments expected; 0 means the frame can no longer complete
    expected: u8,
    /// Payloads by fragment index
    fragments: HashMap<u8, Bytes>,
}

impl FrameBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame id currently held
    pub fn frame_id(&self) -> Option<u16> {
        self.frame_id
    }

    /// Number of fragments the frame needs
    pub fn expected(&self) -> u8 {
        self.expected
    }

    /// Number of distinct fragments held
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Check if no fragments are held
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Check whether `frame_id` is the frame being assembled
    pub fn holds(&self, frame_id: u16) -> bool {
        self.frame_id == Some(frame_id)
    }

    /// Payload stored for `index`
    pub fn get(&self, index: u8) -> Option<&Bytes> {
        self.fragments.get(&index)
    }

    /// Start over for a new frame
    pub fn reset(&mut self, frame_id: u16, expected: u8) {
        self.frame_id = Some(frame_id);
        self.expected = expected;
        self.fragments.clear();
    }

    /// Drop the fragments but keep the frame id, so stragglers of this frame
    /// can never complete it again
    pub fn retire(&mut self) {
        self.expected = 0;
        self.fragments.clear();
    }

    /// Store a fragment payload unless its index is already held
    ///
    /// The caller must have reset the buffer to the fragment's frame id.
    pub fn insert(&mut self, fragment: FrameFragment) -> Insert {
        debug_assert!(self.holds(fragment.frame_id));

        if self.fragments.contains_key(&fragment.index) {
            return Insert::Duplicate;
        }
        self.fragments.insert(fragment.index, fragment.payload);
        Insert::Stored
    }

    /// Check whether as many fragments are held as the frame declared
    pub fn is_ready(&self) -> bool {
        self.expected > 0 && self.fragments.len() == self.expected as usize
    }

    /// Concatenate payloads for indices `0..expected`
    ///
    /// Returns the first missing index if any is absent.
    pub fn concat(&self) -> Result<Bytes, u8> {
        let size = self.fragments.values().map(Bytes::len).sum();
        let mut out = BytesMut::with_capacity(size);

        for index in 0..self.expected {
            let chunk = self.fragments.get(&index).ok_or(index)?;
            out.extend_from_slice(chunk);
        }

        Ok(out.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(index: u8, total: u8, payload: &'static [u8]) -> FrameFragment {
        FrameFragment::new(7, index, total, Bytes::from_static(payload))
    }

    #[test]
    fn test_new_buffer_is_empty() {
        let buffer = FrameBuffer::new();

        assert_eq!(buffer.frame_id(), None);
        assert!(buffer.is_empty());
        assert!(!buffer.is_ready());
    }

    #[test]
    fn test_duplicate_keeps_first_payload() {
        let mut buffer = FrameBuffer::new();
        buffer.reset(7, 2);

        assert_eq!(buffer.insert(fragment(0, 2, b"AB")), Insert::Stored);
        assert_eq!(buffer.insert(fragment(0, 2, b"XX")), Insert::Duplicate);

        assert_eq!(buffer.len(), 1);
        assert_eq!(&buffer.get(0).unwrap()[..], b"AB");
    }

    #[test]
    fn test_concat_in_index_order() {
        let mut buffer = FrameBuffer::new();
        buffer.reset(7, 3);
        buffer.insert(fragment(2, 3, b"EF"));
        buffer.insert(fragment(0, 3, b"AB"));
        buffer.insert(fragment(1, 3, b"CD"));

        assert!(buffer.is_ready());
        assert_eq!(&buffer.concat().unwrap()[..], b"ABCDEF");
    }

    #[test]
    fn test_concat_reports_missing_index() {
        let mut buffer = FrameBuffer::new();
        buffer.reset(7, 2);
        buffer.insert(fragment(0, 2, b"AB"));
        buffer.insert(fragment(5, 2, b"??"));

        assert!(buffer.is_ready());
        assert_eq!(buffer.concat(), Err(1));
    }

    #[test]
    fn test_retire_blocks_completion() {
        let mut buffer = FrameBuffer::new();
        buffer.reset(7, 1);
        buffer.insert(fragment(0, 1, b"AB"));
        buffer.retire();

        assert!(buffer.holds(7));
        assert!(buffer.is_empty());

        buffer.insert(fragment(0, 1, b"AB"));
        assert!(!buffer.is_ready());
    }
}
