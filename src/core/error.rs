//! Error types for the Warp wire format and media collaborators.

use std::io;

use thiserror::Error;

/// Errors in the atom framing layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AtomError {
    /// Declared size is smaller than the header itself.
    #[error("atom size is too small: {0}")]
    TooSmall(u32),

    /// Declared size exceeds the protocol ceiling.
    #[error("atom size is too large: {0}")]
    TooLarge(u32),

    /// Tag is not `warp`.
    #[error("unsupported atom type: {}", String::from_utf8_lossy(.0))]
    UnsupportedType([u8; 4]),

    /// Payload does not fit in a 32-bit atom size.
    #[error("atom payload of {0} bytes does not fit in an atom")]
    PayloadTooLarge(usize),
}

/// Errors encoding or decoding a [`Message`](crate::protocol::Message) payload.
#[derive(Debug, Error)]
pub enum MessageError {
    /// Payload is not a valid JSON message object.
    #[error("failed to decode json payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Encoded message does not fit in an atom.
    #[error("message does not fit in an atom: {0}")]
    Atom(#[from] AtomError),

    /// Throttle loss fraction outside `[0, 1]`.
    #[error("throttle loss fraction out of range: {0}")]
    InvalidLoss(f64),
}

/// Errors reading atoms from an inbound stream.
///
/// Any of these aborts the stream it occurred on.
#[derive(Debug, Error)]
pub enum FramingError {
    /// Header failed validation.
    #[error("invalid atom header: {0}")]
    Atom(#[from] AtomError),

    /// Payload failed to decode.
    #[error("invalid message: {0}")]
    Message(#[from] MessageError),

    /// Stream ended inside an atom header.
    #[error("stream ended inside atom header: got {0} of 8 bytes")]
    TruncatedHeader(usize),

    /// Stream ended inside an atom payload.
    #[error("stream ended inside atom payload: expected {expected} bytes, got {actual}")]
    TruncatedPayload {
        /// Declared payload length.
        expected: usize,
        /// Bytes received before end of stream.
        actual: usize,
    },

    /// I/O error on the underlying stream.
    #[error("failed to read atom: {0}")]
    Io(#[from] io::Error),
}

/// Errors reported by a track source.
#[derive(Debug, Error)]
pub enum MediaError {
    /// Source failed with a message.
    #[error("media source error: {0}")]
    Source(String),

    /// Source failed with an underlying error.
    #[error("media source error: {0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),

    /// I/O error while producing media.
    #[error("media i/o error: {0}")]
    Io(#[from] io::Error),
}

impl MediaError {
    /// Create a source error from a message.
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }
}
