//! # Warp Server
//!
//! Server-side session core of **Warp**, a live media delivery protocol
//! over WebTransport/QUIC-style multiplexed streams.
//!
//! Each media segment travels on its own unidirectional stream, prioritized
//! by its timestamp so that under congestion the newest media goes first and
//! stale media starves instead of stalling playback. It provides:
//!
//! - **Framing**: 8-byte `warp` atoms carrying JSON control messages
//! - **Prioritization**: init streams first, then newest-segment-first
//! - **Non-blocking writes**: media production never waits on the network
//! - **Supervision**: stream-local failures stay local; fatal ones end the
//!   session and close the transport exactly once
//! - **Throttling**: client `throttle` messages drive a network-condition sink
//!
//! ## Feature Flags
//!
//! - `transport` (default): transport traits, outbound stream wrapper,
//!   in-memory loopback transport
//! - `session` (default): task supervisor and session orchestrator
//!
//! ## Modules
//!
//! - [`core`]: constants and error types (always included)
//! - [`protocol`]: atom codec and message model (always included)
//! - [`media`]: track source traits (always included)
//! - [`transport`]: transport layer (requires `transport` feature)
//! - [`session`]: session layer (requires `session` feature)
//!
//! ## Example Usage
//!
//! ```rust
//! use warp_server::prelude::*;
//!
//! let atom = Message::throttle(1_000_000, 65_536, 0.01).to_atom().unwrap();
//! assert_eq!(&atom[4..8], b"warp");
//!
//! let (size, tag) = decode_header(atom[..8].try_into().unwrap());
//! assert_eq!(size as usize, atom.len());
//! assert_eq!(&tag, &WARP_TAG);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Wire protocol (always included)
pub mod protocol;

// Media collaborators (always included)
pub mod media;

// Transport layer (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod transport;

// Session layer (feature-gated)
#[cfg(feature = "session")]
#[cfg_attr(docsrs, doc(cfg(feature = "session")))]
pub mod session;

/// Prelude module for convenient imports.
pub mod prelude {
    // Constants and errors
    pub use crate::core::*;

    // Wire protocol
    pub use crate::protocol::{
        AtomHeader, InitMessage, Message, SegmentMessage, Throttle, decode_header, encode_atom,
    };

    // Media collaborators
    pub use crate::media::{MediaInit, MediaSegment, TrackKind, TrackSource};

    #[cfg(feature = "transport")]
    pub use crate::protocol::AtomReader;

    #[cfg(feature = "transport")]
    pub use crate::transport::{
        OutboundStream, RecvStream, SendStream, StreamDrain, StreamError, Transport,
        TransportError, TransportResult,
    };

    #[cfg(feature = "session")]
    pub use crate::session::{
        ConditionHandle, FramingPolicy, NetworkCondition, NetworkSettings, Session,
        SessionConfig, SessionError, SessionHandle, SessionResult, SessionStats,
    };
}

// Re-export commonly used items at crate root
pub use core::{AtomError, FramingError, MediaError, MessageError};
pub use protocol::Message;

#[cfg(feature = "session")]
pub use session::{Session, SessionConfig, SessionError};
