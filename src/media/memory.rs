//! In-memory track source.
//!
//! Useful for tests and for replaying pre-built segments.

use std::collections::VecDeque;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use super::{MediaInit, MediaSegment, TrackSource};
use crate::core::MediaError;

/// A segment held entirely in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySegment {
    timestamp: Duration,
    chunks: VecDeque<Bytes>,
}

impl MemorySegment {
    /// Create a segment from its chunks.
    pub fn new<I, B>(timestamp: Duration, chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            timestamp,
            chunks: chunks.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a single-chunk segment at `ms` milliseconds.
    pub fn from_millis(ms: u64, data: impl Into<Bytes>) -> Self {
        Self::new(Duration::from_millis(ms), [data.into()])
    }
}

impl MediaSegment for MemorySegment {
    fn timestamp(&self) -> Duration {
        self.timestamp
    }

    async fn read_chunk(&mut self) -> Result<Option<Bytes>, MediaError> {
        Ok(self.chunks.pop_front())
    }
}

type Item = Result<MemorySegment, MediaError>;

/// Feeds segments into a live [`MemoryTrack`].
///
/// Dropping the feed ends the track.
#[derive(Debug)]
pub struct TrackFeed {
    tx: mpsc::UnboundedSender<Item>,
}

impl TrackFeed {
    /// Queue a segment. Returns `false` if the track was dropped.
    pub fn push(&self, segment: MemorySegment) -> bool {
        self.tx.send(Ok(segment)).is_ok()
    }

    /// Make the track's next read fail.
    pub fn fail(&self, msg: impl Into<String>) -> bool {
        self.tx.send(Err(MediaError::source(msg))).is_ok()
    }
}

/// Track source backed by a queue of in-memory segments.
#[derive(Debug)]
pub struct MemoryTrack {
    init: Option<MediaInit>,
    segments: mpsc::UnboundedReceiver<Item>,
}

impl MemoryTrack {
    /// A finite track: `init`, then `segments`, then end of track.
    pub fn new(init: MediaInit, segments: impl IntoIterator<Item = MemorySegment>) -> Self {
        let (track, feed) = Self::live(init);
        for segment in segments {
            feed.push(segment);
        }
        track
    }

    /// A track that yields whatever is pushed into the returned feed.
    pub fn live(init: MediaInit) -> (Self, TrackFeed) {
        let (tx, rx) = mpsc::unbounded_channel();
        let track = Self {
            init: Some(init),
            segments: rx,
        };
        (track, TrackFeed { tx })
    }

    /// A track whose init fetch fails.
    pub fn broken(msg: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(Err(MediaError::source(msg)));
        Self {
            init: None,
            segments: rx,
        }
    }
}

impl TrackSource for MemoryTrack {
    type Segment = MemorySegment;

    async fn init(&mut self) -> Result<MediaInit, MediaError> {
        match self.init.take() {
            Some(init) => Ok(init),
            None => match self.segments.recv().await {
                Some(Err(e)) => Err(e),
                _ => Err(MediaError::source("init segment already taken")),
            },
        }
    }

    async fn next_segment(&mut self) -> Result<Option<MemorySegment>, MediaError> {
        self.segments.recv().await.transpose()
    }
}
