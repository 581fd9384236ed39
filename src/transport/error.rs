//! Transport layer error types.

use std::io;

use thiserror::Error;

use crate::core::MessageError;

/// Errors reported by the underlying multiplexed transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Session handshake was refused or failed.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Connection is closed; no further streams can be accepted or opened.
    #[error("connection closed")]
    ConnectionClosed,

    /// Peer or local side hit a stream limit.
    #[error("stream limit reached")]
    StreamLimit,

    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// Transport-specific failure.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Check if the connection is gone for good.
    pub fn is_closed(&self) -> bool {
        matches!(self, TransportError::ConnectionClosed)
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors from an [`OutboundStream`](super::OutboundStream).
#[derive(Debug, Error)]
pub enum StreamError {
    /// Stream was closed or canceled, or its drain task is gone.
    #[error("stream is closed")]
    Closed,

    /// Message header failed to encode.
    #[error("failed to encode message header: {0}")]
    Encode(#[from] MessageError),

    /// Draining buffered bytes to the transport failed.
    #[error("failed to write to stream: {0}")]
    Write(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed() {
        assert!(TransportError::ConnectionClosed.is_closed());
        assert!(!TransportError::StreamLimit.is_closed());
        assert!(!TransportError::Io(io::Error::other("test")).is_closed());
    }

    #[test]
    fn test_stream_error_display() {
        let err = StreamError::Write(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        assert_eq!(err.to_string(), "failed to write to stream: gone");
    }
}
