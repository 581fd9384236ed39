//! Session error types.

use thiserror::Error;

use crate::core::{FramingError, MediaError};
use crate::media::TrackKind;
use crate::transport::{StreamError, TransportError};

/// Errors ending a session task.
///
/// Whether an error ends the whole session is decided by
/// [`is_fatal`](Self::is_fatal).
#[derive(Debug, Error)]
pub enum SessionError {
    /// Session handshake failed.
    #[error("failed to accept session: {0}")]
    Handshake(#[source] TransportError),

    /// Accepting a bidirectional stream failed.
    #[error("failed to accept bidirectional stream: {0}")]
    AcceptBi(#[source] TransportError),

    /// Accepting a unidirectional stream failed.
    #[error("failed to accept unidirectional stream: {0}")]
    AcceptUni(#[source] TransportError),

    /// Opening an outbound stream failed.
    #[error("failed to create stream: {0}")]
    Open(#[source] TransportError),

    /// A track source failed.
    #[error("{track} track failed: {source}")]
    Media {
        /// Track whose source failed.
        track: TrackKind,
        /// Source error.
        #[source]
        source: MediaError,
    },

    /// A control stream carried a malformed atom.
    #[error("control stream framing error: {error}")]
    Framing {
        /// What was wrong with the atom.
        #[source]
        error: FramingError,
        /// Whether the configured policy escalates this to the session.
        fatal: bool,
    },

    /// An outbound stream failed.
    #[error("outbound stream failed: {0}")]
    Stream(#[from] StreamError),

    /// A task panicked.
    #[error("task {0} panicked")]
    Panicked(&'static str),
}

impl SessionError {
    /// Check if this error must end the session.
    ///
    /// Transport and media failures are fatal. Stream-local failures are
    /// contained to their stream unless the framing policy says otherwise.
    pub fn is_fatal(&self) -> bool {
        match self {
            SessionError::Handshake(_)
            | SessionError::AcceptBi(_)
            | SessionError::AcceptUni(_)
            | SessionError::Open(_)
            | SessionError::Media { .. }
            | SessionError::Panicked(_) => true,
            SessionError::Framing { fatal, .. } => *fatal,
            SessionError::Stream(_) => false,
        }
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
