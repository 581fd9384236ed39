//! In-memory loopback transport.
//!
//! [`pair`] returns a server-side [`MemoryTransport`] and the matching
//! [`MemoryClient`]. Streams are `tokio::io::duplex` pipes; each pipe records
//! the priority, reset code and stop code applied to it so that both ends can
//! observe what the other did.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::sync::{mpsc, watch};

use super::error::{TransportError, TransportResult};
use super::{RecvStream, SendStream, Transport};

/// Default pipe buffer size.
pub const DEFAULT_PIPE_CAPACITY: usize = 64 * 1024;

/// What has been done to a pipe, as seen by either end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipeRecord {
    /// Last priority set by the sender.
    pub priority: Option<i32>,
    /// Reset code, if the sender reset the stream.
    pub reset: Option<u32>,
    /// Stop code, if the receiver canceled reading.
    pub stopped: Option<u32>,
}

#[derive(Debug, Default)]
struct PipeState(Mutex<PipeRecord>);

impl PipeState {
    fn get(&self) -> PipeRecord {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut PipeRecord)) {
        f(&mut self.0.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

/// Create a unidirectional pipe holding at most `capacity` unread bytes.
pub fn pipe(capacity: usize) -> (MemorySendStream, MemoryRecvStream) {
    let (tx, rx) = tokio::io::duplex(capacity);
    let state = Arc::new(PipeState::default());

    let send = MemorySendStream {
        pipe: Some(tx),
        state: Arc::clone(&state),
    };
    let recv = MemoryRecvStream {
        pipe: Some(rx),
        state,
    };
    (send, recv)
}

/// Sending end of an in-memory pipe.
#[derive(Debug)]
pub struct MemorySendStream {
    pipe: Option<DuplexStream>,
    state: Arc<PipeState>,
}

impl MemorySendStream {
    /// Snapshot of the pipe's record.
    pub fn record(&self) -> PipeRecord {
        self.state.get()
    }

    /// Stop code sent by the receiver, if any.
    pub fn stopped(&self) -> Option<u32> {
        self.record().stopped
    }

    fn check(&mut self) -> io::Result<&mut DuplexStream> {
        if let Some(code) = self.state.get().stopped {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                format!("stream stopped by peer with code {code}"),
            ));
        }
        self.pipe
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "stream was reset"))
    }
}

impl AsyncWrite for MemorySendStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.check() {
            Ok(pipe) => Pin::new(pipe).poll_write(cx, buf),
            Err(e) => Poll::Ready(Err(e)),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.check() {
            Ok(pipe) => Pin::new(pipe).poll_flush(cx),
            Err(e) => Poll::Ready(Err(e)),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.check() {
            Ok(pipe) => Pin::new(pipe).poll_shutdown(cx),
            Err(e) => Poll::Ready(Err(e)),
        }
    }
}

impl SendStream for MemorySendStream {
    fn set_priority(&mut self, priority: i32) {
        self.state.update(|r| r.priority = Some(priority));
    }

    fn reset(&mut self, code: u32) {
        self.state.update(|r| r.reset = Some(code));
        self.pipe = None;
    }
}

/// Receiving end of an in-memory pipe.
#[derive(Debug)]
pub struct MemoryRecvStream {
    pipe: Option<DuplexStream>,
    state: Arc<PipeState>,
}

impl MemoryRecvStream {
    /// Snapshot of the pipe's record.
    pub fn record(&self) -> PipeRecord {
        self.state.get()
    }

    /// Priority the sender assigned to this stream.
    pub fn priority(&self) -> Option<i32> {
        self.record().priority
    }

    /// Reset code sent by the sender, if any.
    pub fn reset_code(&self) -> Option<u32> {
        self.record().reset
    }

    /// Stop code this end sent, if any.
    pub fn stopped(&self) -> Option<u32> {
        self.record().stopped
    }
}

impl AsyncRead for MemoryRecvStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if let Some(code) = self.state.get().reset {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                format!("stream reset by peer with code {code}"),
            )));
        }
        match self.pipe.as_mut() {
            Some(pipe) => Pin::new(pipe).poll_read(cx, buf),
            None => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "stream was stopped",
            ))),
        }
    }
}

impl RecvStream for MemoryRecvStream {
    fn stop(&mut self, code: u32) {
        self.state.update(|r| r.stopped = Some(code));
        self.pipe = None;
    }
}

type BiPair = (MemorySendStream, MemoryRecvStream);

/// Create a connected server transport and client.
pub fn pair() -> (MemoryTransport, MemoryClient) {
    pair_with_capacity(DEFAULT_PIPE_CAPACITY)
}

/// Like [`pair`], with a custom pipe capacity for every stream.
pub fn pair_with_capacity(capacity: usize) -> (MemoryTransport, MemoryClient) {
    let (bi_tx, bi_rx) = mpsc::unbounded_channel();
    let (uni_tx, uni_rx) = mpsc::unbounded_channel();
    let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
    let (closed_tx, closed_rx) = watch::channel(None);

    let server = MemoryTransport {
        bi: tokio::sync::Mutex::new(bi_rx),
        uni: tokio::sync::Mutex::new(uni_rx),
        outgoing: incoming_tx,
        closed: closed_tx,
        close_count: AtomicUsize::new(0),
        capacity,
    };

    let client = MemoryClient {
        bi: bi_tx,
        uni: uni_tx,
        incoming: incoming_rx,
        closed: closed_rx,
        capacity,
    };

    (server, client)
}

/// Server side of an in-memory connection.
#[derive(Debug)]
pub struct MemoryTransport {
    bi: tokio::sync::Mutex<mpsc::UnboundedReceiver<BiPair>>,
    uni: tokio::sync::Mutex<mpsc::UnboundedReceiver<MemoryRecvStream>>,
    outgoing: mpsc::UnboundedSender<MemoryRecvStream>,
    closed: watch::Sender<Option<(u32, String)>>,
    close_count: AtomicUsize,
    capacity: usize,
}

impl MemoryTransport {
    /// Number of times [`Transport::close`] was called.
    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }

    /// Code and reason of the first close, if closed.
    pub fn close_reason(&self) -> Option<(u32, String)> {
        self.closed.borrow().clone()
    }

    async fn recv_or_closed<T>(
        &self,
        rx: &tokio::sync::Mutex<mpsc::UnboundedReceiver<T>>,
    ) -> TransportResult<T> {
        let mut closed = self.closed.subscribe();
        if closed.borrow().is_some() {
            return Err(TransportError::ConnectionClosed);
        }

        let mut rx = rx.lock().await;
        tokio::select! {
            item = rx.recv() => item.ok_or(TransportError::ConnectionClosed),
            _ = closed.changed() => Err(TransportError::ConnectionClosed),
        }
    }
}

impl Transport for MemoryTransport {
    type SendStream = MemorySendStream;
    type RecvStream = MemoryRecvStream;

    async fn accept_session(&self) -> TransportResult<()> {
        if self.closed.borrow().is_some() {
            return Err(TransportError::Handshake("connection already closed".into()));
        }
        Ok(())
    }

    async fn accept_bi(&self) -> TransportResult<BiPair> {
        self.recv_or_closed(&self.bi).await
    }

    async fn accept_uni(&self) -> TransportResult<MemoryRecvStream> {
        self.recv_or_closed(&self.uni).await
    }

    async fn open_uni(&self) -> TransportResult<MemorySendStream> {
        if self.closed.borrow().is_some() {
            return Err(TransportError::ConnectionClosed);
        }

        let (send, recv) = pipe(self.capacity);
        self.outgoing
            .send(recv)
            .map_err(|_| TransportError::ConnectionClosed)?;
        Ok(send)
    }

    fn close(&self, code: u32, reason: &str) {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        self.closed.send_if_modified(|closed| {
            if closed.is_some() {
                return false;
            }
            *closed = Some((code, reason.to_string()));
            true
        });
    }
}

/// Client side of an in-memory connection.
#[derive(Debug)]
pub struct MemoryClient {
    bi: mpsc::UnboundedSender<BiPair>,
    uni: mpsc::UnboundedSender<MemoryRecvStream>,
    incoming: mpsc::UnboundedReceiver<MemoryRecvStream>,
    closed: watch::Receiver<Option<(u32, String)>>,
    capacity: usize,
}

impl MemoryClient {
    /// Open a stream towards the server.
    pub fn open_uni(&self) -> TransportResult<MemorySendStream> {
        let (send, recv) = pipe(self.capacity);
        self.uni
            .send(recv)
            .map_err(|_| TransportError::ConnectionClosed)?;
        Ok(send)
    }

    /// Open a bidirectional stream; returns the client's halves.
    pub fn open_bi(&self) -> TransportResult<BiPair> {
        let (client_send, server_recv) = pipe(self.capacity);
        let (server_send, client_recv) = pipe(self.capacity);
        self.bi
            .send((server_send, server_recv))
            .map_err(|_| TransportError::ConnectionClosed)?;
        Ok((client_send, client_recv))
    }

    /// Next stream opened by the server, or `None` once the server is gone
    /// and every opened stream has been taken.
    pub async fn accept_uni(&mut self) -> Option<MemoryRecvStream> {
        self.incoming.recv().await
    }

    /// Code and reason the server closed with, if closed.
    pub fn close_reason(&self) -> Option<(u32, String)> {
        self.closed.borrow().clone()
    }

    /// Wait for the server to close the connection.
    pub async fn closed(&mut self) -> Option<(u32, String)> {
        let _ = self.closed.wait_for(Option::is_some).await;
        self.close_reason()
    }
}
