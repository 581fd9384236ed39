//! Atom encoding and decoding.
//!
//! Every Warp message travels inside an atom:
//!
//! Wire format (8-byte header + payload):
//! ```text
//! +--------------------+------------------+---------------------+
//! | Size               | Tag              | Payload             |
//! | 4 bytes (BE32)     | 4 bytes ASCII    | size - 8 bytes      |
//! +--------------------+------------------+---------------------+
//! ```
//!
//! `size` counts the header. Inbound atoms are accepted only when
//! `8 <= size <= 42069` and the tag is `warp`.

use bytes::{BufMut, Bytes, BytesMut};

use crate::core::{ATOM_HEADER_SIZE, AtomError, MAX_ATOM_SIZE, MIN_ATOM_SIZE, WARP_TAG};

/// Parsed atom header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtomHeader {
    /// Total atom size, header included.
    pub size: u32,
    /// Four-byte type tag.
    pub tag: [u8; 4],
}

impl AtomHeader {
    /// Create the header for an atom carrying `payload_len` bytes.
    pub fn new(tag: [u8; 4], payload_len: usize) -> Result<Self, AtomError> {
        let size = payload_len
            .checked_add(ATOM_HEADER_SIZE)
            .and_then(|size| u32::try_from(size).ok())
            .ok_or(AtomError::PayloadTooLarge(payload_len))?;

        Ok(Self { size, tag })
    }

    /// Create a `warp` header for `payload_len` bytes.
    pub fn warp(payload_len: usize) -> Result<Self, AtomError> {
        Self::new(WARP_TAG, payload_len)
    }

    /// Serialize header to bytes (8 bytes).
    pub fn to_bytes(&self) -> [u8; ATOM_HEADER_SIZE] {
        let mut buf = [0u8; ATOM_HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.size.to_be_bytes());
        buf[4..8].copy_from_slice(&self.tag);
        buf
    }

    /// Parse header from bytes without validating it.
    pub fn from_bytes(bytes: &[u8; ATOM_HEADER_SIZE]) -> Self {
        let size = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let tag = [bytes[4], bytes[5], bytes[6], bytes[7]];
        Self { size, tag }
    }

    /// Check size bounds and tag.
    pub fn validate(&self) -> Result<(), AtomError> {
        if self.size < MIN_ATOM_SIZE {
            return Err(AtomError::TooSmall(self.size));
        }
        if self.size > MAX_ATOM_SIZE {
            return Err(AtomError::TooLarge(self.size));
        }
        if self.tag != WARP_TAG {
            return Err(AtomError::UnsupportedType(self.tag));
        }
        Ok(())
    }

    /// Length of the payload following the header.
    pub fn payload_len(&self) -> usize {
        (self.size as usize).saturating_sub(ATOM_HEADER_SIZE)
    }
}

/// Encode a complete atom: size, tag, then payload.
pub fn encode_atom(tag: [u8; 4], payload: &[u8]) -> Result<Bytes, AtomError> {
    let header = AtomHeader::new(tag, payload.len())?;

    let mut buf = BytesMut::with_capacity(ATOM_HEADER_SIZE + payload.len());
    buf.put_u32(header.size);
    buf.put_slice(&header.tag);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Decode an atom header into `(size, tag)`. Inverse of [`encode_atom`]'s header.
pub fn decode_header(bytes: &[u8; ATOM_HEADER_SIZE]) -> (u32, [u8; 4]) {
    let header = AtomHeader::from_bytes(bytes);
    (header.size, header.tag)
}

/// Decode and validate an inbound atom header.
pub fn parse_header(bytes: &[u8; ATOM_HEADER_SIZE]) -> Result<AtomHeader, AtomError> {
    let header = AtomHeader::from_bytes(bytes);
    header.validate()?;
    Ok(header)
}
