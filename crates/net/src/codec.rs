//! Length-prefixed framing for ethernet frames on a byte stream.
//!
//! Every frame on the wire is a 2-byte little-endian length followed by
//! exactly that many bytes of ethernet frame (header and payload):
//!
//! ```text
//! +--------+--------+------------------------------------------+
//! | len lo | len hi | dst mac (6) | src mac (6) | type (2) | .. |
//! +--------+--------+------------------------------------------+
//! ```

use crate::error::NetError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Size of the length field in front of every frame.
pub const LENGTH_PREFIX_LEN: usize = 2;

/// Size of an ethernet header without VLAN tags.
pub const ETHERNET_HEADER_LEN: usize = 14;

/// Largest frame the length field can describe.
pub const MAX_WIRE_FRAME_LEN: usize = u16::MAX as usize;

/// Encode the length field for a frame of `len` bytes.
pub fn length_prefix(len: usize) -> Result<[u8; LENGTH_PREFIX_LEN], NetError> {
    let len = u16::try_from(len).map_err(|_| NetError::FrameTooLarge {
        len,
        max: MAX_WIRE_FRAME_LEN,
    })?;
    Ok(len.to_le_bytes())
}

/// Encode a complete frame into its wire representation.
pub fn encode(frame: &[u8]) -> Result<Bytes, NetError> {
    let mut dst = BytesMut::with_capacity(LENGTH_PREFIX_LEN + frame.len());
    LinkFrameCodec::default().encode(frame, &mut dst)?;
    Ok(dst.freeze())
}

/// Codec for the length-prefixed frame format.
///
/// Decoding never yields a partial frame: if the stream ends between the
/// length field and the end of the declared body, `FramedRead` reports an
/// error instead of a frame. Declared lengths above `max_frame_len` are
/// rejected before any body bytes are buffered.
#[derive(Debug, Clone, Copy)]
pub struct LinkFrameCodec {
    max_frame_len: usize,
}

impl LinkFrameCodec {
    /// Create a codec that accepts frames of at most `max_frame_len` bytes.
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            max_frame_len: max_frame_len.min(MAX_WIRE_FRAME_LEN),
        }
    }

    /// Create a codec sized for an interface with the given MTU.
    pub fn for_mtu(mtu: u32) -> Self {
        Self::new(mtu as usize + ETHERNET_HEADER_LEN)
    }

    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }
}

impl Default for LinkFrameCodec {
    fn default() -> Self {
        Self::new(MAX_WIRE_FRAME_LEN)
    }
}

impl Decoder for LinkFrameCodec {
    type Item = BytesMut;
    type Error = NetError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>, NetError> {
        if src.len() < LENGTH_PREFIX_LEN {
            src.reserve(LENGTH_PREFIX_LEN - src.len());
            return Ok(None);
        }

        let len = u16::from_le_bytes([src[0], src[1]]) as usize;
        if len > self.max_frame_len {
            return Err(NetError::FrameTooLarge {
                len,
                max: self.max_frame_len,
            });
        }

        let total = LENGTH_PREFIX_LEN + len;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX_LEN);
        Ok(Some(src.split_to(len)))
    }
}

impl Encoder<&[u8]> for LinkFrameCodec {
    type Error = NetError;

    fn encode(&mut self, frame: &[u8], dst: &mut BytesMut) -> Result<(), NetError> {
        let prefix = length_prefix(frame.len())?;
        dst.reserve(LENGTH_PREFIX_LEN + frame.len());
        dst.put_slice(&prefix);
        dst.put_slice(frame);
        Ok(())
    }
}
