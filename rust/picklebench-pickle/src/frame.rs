//! Pickle frame header.
//!
//! ```text
//! byte 0     : VERSION (bits 0..4) | METHOD (bits 4..6)
//! bytes 1..5 : uncompressed length, u32 little-endian
//! bytes 5..  : payload
//! ```

use picklebench_buffers::GrowableBuffer;
use picklebench_common::{Error, Result, verify_data};

use crate::compression::Method;

/// Frame format version written to the low bits of the flags byte.
pub const VERSION: u8 = 1;
/// Size of the encoded header in bytes.
pub const HEADER_LEN: usize = 5;

const VERSION_MASK: u8 = 0x0F;
const METHOD_SHIFT: u8 = 4;
const RESERVED_MASK: u8 = 0xC0;

/// Decoded pickle frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// How the payload is encoded.
    pub method: Method,
    /// Length of the original bytes. For compressed payloads this is only
    /// what the producer claims; decoders verify it.
    pub uncompressed_len: u32,
}

impl FrameHeader {
    /// Builds a header for a payload encoded with `method` from
    /// `uncompressed_len` original bytes.
    pub fn new(method: Method, uncompressed_len: u32) -> FrameHeader {
        FrameHeader {
            method,
            uncompressed_len,
        }
    }

    /// Encodes the header.
    ///
    /// # Returns
    ///
    /// The flags byte (version and method) followed by the little-endian
    /// uncompressed length.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0] = VERSION | ((self.method as u8) << METHOD_SHIFT);
        bytes[1..].copy_from_slice(&self.uncompressed_len.to_le_bytes());
        bytes
    }

    /// Appends the encoded header to `target`.
    ///
    /// # Arguments
    ///
    /// * `target` - Buffer the header is appended to, after its written data.
    ///
    /// # Returns
    ///
    /// `CapacityExceeded` if the header does not fit under the buffer limit.
    pub fn write(&self, target: &mut GrowableBuffer<u8>) -> Result<()> {
        let tail = target.writable_tail(HEADER_LEN)?;
        tail[..HEADER_LEN].copy_from_slice(&self.to_bytes());
        target.advance(HEADER_LEN)
    }

    /// Splits a pickled frame into its header and payload.
    ///
    /// # Arguments
    ///
    /// * `frame` - The complete frame, header included.
    ///
    /// # Returns
    ///
    /// The header and the payload slice that follows it. Frames shorter than
    /// the header, with an unknown version or method, or with reserved bits
    /// set fail with `CorruptData`. The payload length is not checked here.
    pub fn parse(frame: &[u8]) -> Result<(FrameHeader, &[u8])> {
        verify_data!(pickle_header, frame.len() >= HEADER_LEN);
        let flags = frame[0];
        if flags & VERSION_MASK != VERSION {
            return Err(Error::corrupt_data(
                "pickle header",
                format!("unsupported version {}", flags & VERSION_MASK),
            ));
        }
        verify_data!(pickle_header, flags & RESERVED_MASK == 0);
        let method = Method::from_bits(flags >> METHOD_SHIFT).ok_or_else(|| {
            Error::corrupt_data(
                "pickle header",
                format!("unknown method {}", flags >> METHOD_SHIFT),
            )
        })?;
        let uncompressed_len = u32::from_le_bytes([frame[1], frame[2], frame[3], frame[4]]);
        Ok((
            FrameHeader::new(method, uncompressed_len),
            &frame[HEADER_LEN..],
        ))
    }
}
