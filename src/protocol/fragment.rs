//! UDP video fragment format
//!
//! Every datagram carries one slice of one frame:
//!
//! ```text
//! ┌──────────────┬───────────┬───────────┬─────────────────┐
//! │ frame id     │ index     │ total     │ payload         │
//! │ u16 BE       │ u8        │ u8        │ remainder       │
//! └──────────────┴───────────┴───────────┴─────────────────┘
//! ```
//!
//! The frame id wraps at 65536. Indices are 0-based.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::protocol::constants::{FRAGMENT_HEADER_SIZE, MAX_FRAGMENTS_PER_FRAME};

/// One decoded datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameFragment {
    /// Frame this fragment belongs to
    pub frame_id: u16,
    /// Position of this fragment within the frame
    pub index: u8,
    /// Declared number of fragments in the frame
    pub total: u8,
    /// Raw payload slice
    pub payload: Bytes,
}

impl FrameFragment {
    /// Create a fragment
    pub fn new(frame_id: u16, index: u8, total: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            frame_id,
            index,
            total,
            payload: payload.into(),
        }
    }

    /// Decode a datagram
    ///
    /// Datagrams shorter than the header are rejected. An empty payload is
    /// valid.
    pub fn decode(mut datagram: Bytes) -> Result<Self, ProtocolError> {
        if datagram.len() < FRAGMENT_HEADER_SIZE {
            return Err(ProtocolError::ShortDatagram(datagram.len()));
        }

        let frame_id = datagram.get_u16();
        let index = datagram.get_u8();
        let total = datagram.get_u8();

        Ok(Self {
            frame_id,
            index,
            total,
            payload: datagram,
        })
    }

    /// Encode header and payload into one datagram
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAGMENT_HEADER_SIZE + self.payload.len());
        buf.put_u16(self.frame_id);
        buf.put_u8(self.index);
        buf.put_u8(self.total);
        buf.put_slice(&self.payload);
        buf.freeze()
    }
}

/// Split a frame into fragments of at most `max_payload` bytes
///
/// An empty frame still produces one (empty) fragment. Frames that would need
/// more than 255 fragments are rejected.
pub fn split_frame(
    frame_id: u16,
    data: &Bytes,
    max_payload: usize,
) -> Result<Vec<FrameFragment>, ProtocolError> {
    let max_payload = max_payload.max(1);
    let count = data.len().div_ceil(max_payload).max(1);

    if count > MAX_FRAGMENTS_PER_FRAME {
        return Err(ProtocolError::FrameTooLarge {
            size: data.len(),
            max: MAX_FRAGMENTS_PER_FRAME,
        });
    }

    let total = count as u8;
    let fragments = (0..count)
        .map(|i| {
            let start = i * max_payload;
            let end = (start + max_payload).min(data.len());
            FrameFragment::new(frame_id, i as u8, total, data.slice(start..end))
        })
        .collect();

    Ok(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_header() {
        let datagram = Bytes::from_static(&[0x01, 0x02, 0x03, 0x05, b'x', b'y']);
        let fragment = FrameFragment::decode(datagram).unwrap();

        assert_eq!(fragment.frame_id, 0x0102);
        assert_eq!(fragment.index, 3);
        assert_eq!(fragment.total, 5);
        assert_eq!(&fragment.payload[..], b"xy");
    }

    #[test]
    fn test_decode_header_only() {
        let fragment = FrameFragment::decode(Bytes::from_static(&[0xFF, 0xFF, 0, 1])).unwrap();

        assert_eq!(fragment.frame_id, u16::MAX);
        assert!(fragment.payload.is_empty());
    }

    #[test]
    fn test_decode_short_datagram() {
        let result = FrameFragment::decode(Bytes::from_static(&[0x00, 0x07, 0x00]));
        assert_eq!(result, Err(ProtocolError::ShortDatagram(3)));

        let result = FrameFragment::decode(Bytes::new());
        assert_eq!(result, Err(ProtocolError::ShortDatagram(0)));
    }

    #[test]
    fn test_encode_layout() {
        let fragment = FrameFragment::new(7, 1, 2, Bytes::from_static(b"CD"));
        assert_eq!(&fragment.encode()[..], &[0x00, 0x07, 0x01, 0x02, b'C', b'D']);
    }

    #[test]
    fn test_split_frame() {
        let data = Bytes::from_static(b"ABCDE");
        let fragments = split_frame(9, &data, 2).unwrap();

        assert_eq!(fragments.len(), 3);
        assert!(fragments.iter().all(|f| f.frame_id == 9 && f.total == 3));
        assert_eq!(&fragments[0].payload[..], b"AB");
        assert_eq!(&fragments[1].payload[..], b"CD");
        assert_eq!(&fragments[2].payload[..], b"E");
        assert_eq!(fragments[2].index, 2);
    }

    #[test]
    fn test_split_empty_frame() {
        let fragments = split_frame(1, &Bytes::new(), 1400).unwrap();

        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].total, 1);
        assert!(fragments[0].payload.is_empty());
    }

    #[test]
    fn test_split_frame_too_large() {
        let data = Bytes::from(vec![0u8; 256]);
        let result = split_frame(1, &data, 1);

        assert_eq!(
            result,
            Err(ProtocolError::FrameTooLarge {
                size: 256,
                max: 255
            })
        );
    }
}
