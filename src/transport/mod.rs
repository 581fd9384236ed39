//! Warp - Transport Layer
//!
//! The session runs over any multiplexed, stream-oriented transport
//! (WebTransport, raw QUIC, or the in-memory [`memory`] loopback). This
//! module defines the seams:
//!
//! - [`Transport`]: session handshake, stream accept/open, close
//! - [`SendStream`] / [`RecvStream`]: one direction of a transport stream
//! - [`OutboundStream`]: buffers writes so media production never waits on
//!   the network, drained to the transport by a [`StreamDrain`] task
//!
//! # Priority
//!
//! [`SendStream::set_priority`] follows the QUIC convention used by quinn and
//! web-transport: higher values are serviced first.

mod error;
pub mod memory;
mod stream;

use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};

pub use error::*;
pub use stream::{OutboundStream, StreamDrain};

/// Outgoing half of a transport stream.
///
/// Closing cleanly is [`AsyncWriteExt::shutdown`](tokio::io::AsyncWriteExt::shutdown).
pub trait SendStream: AsyncWrite + Send + Unpin + 'static {
    /// Set the scheduling priority. Higher values are sent first.
    fn set_priority(&mut self, priority: i32);

    /// Abandon unsent data and reset the stream with `code`.
    fn reset(&mut self, code: u32);
}

/// Incoming half of a transport stream.
pub trait RecvStream: AsyncRead + Send + Unpin + 'static {
    /// Cancel the read side, asking the peer to stop sending with `code`.
    fn stop(&mut self, code: u32);
}

/// A single client connection on a multiplexed transport.
pub trait Transport: Send + Sync + 'static {
    /// Outgoing stream type.
    type SendStream: SendStream;
    /// Incoming stream type.
    type RecvStream: RecvStream;

    /// Complete the session handshake.
    fn accept_session(&self) -> impl Future<Output = TransportResult<()>> + Send;

    /// Accept the next bidirectional stream opened by the peer.
    fn accept_bi(
        &self,
    ) -> impl Future<Output = TransportResult<(Self::SendStream, Self::RecvStream)>> + Send;

    /// Accept the next unidirectional stream opened by the peer.
    fn accept_uni(&self) -> impl Future<Output = TransportResult<Self::RecvStream>> + Send;

    /// Open a unidirectional stream, waiting for stream credit if needed.
    fn open_uni(&self) -> impl Future<Output = TransportResult<Self::SendStream>> + Send;

    /// Close the connection.
    fn close(&self, code: u32, reason: &str);
}
