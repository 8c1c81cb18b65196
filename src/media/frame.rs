//! Completed video frames
//!
//! A frame is the concatenation of every fragment payload for one frame id.
//! The bytes are opaque here; decoding into an image belongs to the consumer.

use bytes::Bytes;

/// JPEG start-of-image marker
const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// A fully reassembled frame
///
/// Cheap to clone: the payload is reference counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedFrame {
    /// Frame id the fragments carried
    pub frame_id: u16,
    /// Fragment payloads concatenated in index order
    pub data: Bytes,
}

impl CompletedFrame {
    /// Create a frame
    pub fn new(frame_id: u16, data: Bytes) -> Self {
        Self { frame_id, data }
    }

    /// Frame size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the frame carries no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check for a JPEG start-of-image marker at the front
    pub fn looks_like_jpeg(&self) -> bool {
        self.data.starts_with(&JPEG_SOI)
    }

    /// Offset of the first JPEG start-of-image marker, if any
    ///
    /// Some camera firmware prefixes the image with a few bytes of its own.
    pub fn jpeg_start(&self) -> Option<usize> {
        self.data.windows(2).position(|w| w == JPEG_SOI)
    }
}
