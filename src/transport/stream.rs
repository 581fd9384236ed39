//! Non-blocking outbound stream wrapper.
//!
//! Writers push bytes into an unbounded queue and return immediately. A
//! separate [`StreamDrain`] task owns the transport stream and copies the
//! queue into it, so transport backpressure builds up in the queue instead of
//! stalling media production.
//!
//! ```text
//!  writer ──write()──▶ [ queue ] ──StreamDrain::run()──▶ SendStream
//!         ──cancel()──────────────────────────────────▶ reset(code)
//! ```

use std::future::pending;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};

use super::SendStream;
use super::error::StreamError;
use crate::core::DEFAULT_RESET_CODE;
use crate::protocol::Message;

#[derive(Debug)]
enum Command {
    Priority(i32),
    Data(Bytes),
}

/// Writer side of a buffered outbound stream.
///
/// Dropping it without [`cancel`](Self::cancel) behaves like
/// [`close`](Self::close).
#[derive(Debug)]
pub struct OutboundStream {
    queue: Option<mpsc::UnboundedSender<Command>>,
    reset: Option<oneshot::Sender<u32>>,
    buffered: Arc<AtomicUsize>,
    priority: Option<i32>,
}

impl OutboundStream {
    /// Wrap a freshly opened stream.
    ///
    /// The returned [`StreamDrain`] must be spawned for any bytes to reach
    /// the transport.
    pub fn new<S: SendStream>(stream: S) -> (Self, StreamDrain<S>) {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (reset_tx, reset_rx) = oneshot::channel();
        let buffered = Arc::new(AtomicUsize::new(0));

        let writer = Self {
            queue: Some(queue_tx),
            reset: Some(reset_tx),
            buffered: Arc::clone(&buffered),
            priority: None,
        };

        let drain = StreamDrain {
            stream,
            queue: queue_rx,
            reset: Some(reset_rx),
            buffered,
            reset_code: DEFAULT_RESET_CODE,
        };

        (writer, drain)
    }

    /// Set the transport priority.
    ///
    /// Applied by the drain in queue order, so calling this before the first
    /// write applies it before any bytes are sent.
    pub fn set_priority(&mut self, priority: i32) -> Result<(), StreamError> {
        self.send(Command::Priority(priority))?;
        self.priority = Some(priority);
        Ok(())
    }

    /// Encode and enqueue one atom carrying `msg`.
    pub fn write_message(&mut self, msg: &Message) -> Result<(), StreamError> {
        let atom = msg.to_atom()?;
        self.write(atom)
    }

    /// Enqueue bytes. Never waits for the transport.
    pub fn write(&mut self, data: impl Into<Bytes>) -> Result<(), StreamError> {
        let data = data.into();
        if data.is_empty() {
            return if self.is_closed() {
                Err(StreamError::Closed)
            } else {
                Ok(())
            };
        }

        let len = data.len();
        self.buffered.fetch_add(len, Ordering::Relaxed);
        if let Err(e) = self.send(Command::Data(data)) {
            self.buffered.fetch_sub(len, Ordering::Relaxed);
            return Err(e);
        }
        Ok(())
    }

    /// Finish the stream once everything queued has been written.
    pub fn close(&mut self) -> Result<(), StreamError> {
        let queue = self.queue.take().ok_or(StreamError::Closed)?;
        if queue.is_closed() {
            return Err(StreamError::Closed);
        }
        Ok(())
    }

    /// Discard queued bytes and reset the stream with `code`.
    pub fn cancel(&mut self, code: u32) {
        self.queue = None;
        if let Some(reset) = self.reset.take() {
            let _ = reset.send(code);
        }
    }

    /// Priority last set on this stream.
    pub fn priority(&self) -> Option<i32> {
        self.priority
    }

    /// Bytes queued but not yet accepted by the transport.
    pub fn buffered_bytes(&self) -> usize {
        self.buffered.load(Ordering::Relaxed)
    }

    /// Check if the stream no longer accepts writes.
    pub fn is_closed(&self) -> bool {
        self.queue.as_ref().is_none_or(|queue| queue.is_closed())
    }

    fn send(&self, cmd: Command) -> Result<(), StreamError> {
        let queue = self.queue.as_ref().ok_or(StreamError::Closed)?;
        queue.send(cmd).map_err(|_| StreamError::Closed)
    }
}

/// Background task moving queued bytes onto the transport stream.
#[derive(Debug)]
pub struct StreamDrain<S> {
    stream: S,
    queue: mpsc::UnboundedReceiver<Command>,
    reset: Option<oneshot::Receiver<u32>>,
    buffered: Arc<AtomicUsize>,
    reset_code: u32,
}

enum Next {
    Command(Option<Command>),
    Reset(u32),
}

enum Written {
    Done(std::io::Result<()>),
    Reset(u32),
}

impl<S: SendStream> StreamDrain<S> {
    /// Code used to reset the stream when a write fails.
    pub fn with_reset_code(mut self, code: u32) -> Self {
        self.reset_code = code;
        self
    }

    /// Drain until the writer closes or cancels, or the transport fails.
    ///
    /// A write failure resets the stream and is returned as that stream's
    /// terminal error.
    pub async fn run(mut self) -> Result<(), StreamError> {
        loop {
            let next = tokio::select! {
                biased;
                code = reset_requested(&mut self.reset) => Next::Reset(code),
                cmd = self.queue.recv() => Next::Command(cmd),
            };

            let data = match next {
                Next::Reset(code) => return self.abort(code),
                Next::Command(Some(Command::Priority(priority))) => {
                    self.stream.set_priority(priority);
                    continue;
                }
                Next::Command(Some(Command::Data(data))) => data,
                Next::Command(None) => return self.finish().await,
            };

            let written = tokio::select! {
                biased;
                code = reset_requested(&mut self.reset) => Written::Reset(code),
                res = self.stream.write_all(&data) => Written::Done(res),
            };

            match written {
                Written::Done(Ok(())) => {
                    self.buffered.fetch_sub(data.len(), Ordering::Relaxed);
                }
                Written::Done(Err(e)) => {
                    self.stream.reset(self.reset_code);
                    return Err(StreamError::Write(e));
                }
                Written::Reset(code) => return self.abort(code),
            }
        }
    }

    async fn finish(&mut self) -> Result<(), StreamError> {
        if let Err(e) = self.stream.shutdown().await {
            self.stream.reset(self.reset_code);
            return Err(StreamError::Write(e));
        }
        Ok(())
    }

    fn abort(&mut self, code: u32) -> Result<(), StreamError> {
        self.queue.close();
        self.buffered.store(0, Ordering::Relaxed);
        self.stream.reset(code);
        Ok(())
    }
}

/// Resolves only when a reset was actually requested.
async fn reset_requested(reset: &mut Option<oneshot::Receiver<u32>>) -> u32 {
    let res = match reset.as_mut() {
        Some(rx) => rx.await,
        None => return pending().await,
    };

    match res {
        Ok(code) => code,
        Err(_) => {
            // Writer dropped without canceling.
            *reset = None;
            pending().await
        }
    }
}
