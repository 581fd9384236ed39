//! Media collaborators consumed by the session.
//!
//! The session does not demux or encode anything. It asks a [`TrackSource`]
//! for one [`MediaInit`] and then a sequence of [`MediaSegment`]s, and copies
//! their bytes onto outbound streams.

#[cfg(feature = "transport")]
mod memory;

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;

use crate::core::{AUDIO_TRACK_ID, MediaError, VIDEO_TRACK_ID};

#[cfg(feature = "transport")]
pub use memory::{MemorySegment, MemoryTrack, TrackFeed};

/// One of the two tracks a session delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    /// Audio track (id 1).
    Audio,
    /// Video track (id 2).
    Video,
}

impl TrackKind {
    /// Wire track id.
    pub fn id(self) -> u32 {
        match self {
            Self::Audio => AUDIO_TRACK_ID,
            Self::Video => VIDEO_TRACK_ID,
        }
    }

    /// Parse a wire track id.
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            AUDIO_TRACK_ID => Some(Self::Audio),
            VIDEO_TRACK_ID => Some(Self::Video),
            _ => None,
        }
    }

    /// Lowercase name, for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Initialization data a track's decoder needs before any segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInit {
    raw: Bytes,
}

impl MediaInit {
    /// Wrap raw init bytes.
    pub fn new(raw: impl Into<Bytes>) -> Self {
        Self { raw: raw.into() }
    }

    /// Raw init bytes.
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }
}

/// One timestamped unit of track data.
///
/// Chunks are produced lazily, in order, and only once.
pub trait MediaSegment: Send + 'static {
    /// Presentation time since track start.
    fn timestamp(&self) -> Duration;

    /// Next chunk of segment data, or `None` when the segment is complete.
    fn read_chunk(&mut self) -> impl Future<Output = Result<Option<Bytes>, MediaError>> + Send;
}

/// Produces the init blob and segments of a single track.
///
/// Read by exactly one writer task.
pub trait TrackSource: Send + 'static {
    /// Segment type yielded by this source.
    type Segment: MediaSegment;

    /// Fetch the track's init blob. Called once.
    fn init(&mut self) -> impl Future<Output = Result<MediaInit, MediaError>> + Send;

    /// Fetch the next segment, or `None` at end of track.
    fn next_segment(
        &mut self,
    ) -> impl Future<Output = Result<Option<Self::Segment>, MediaError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_ids() {
        assert_eq!(TrackKind::Audio.id(), 1);
        assert_eq!(TrackKind::Video.id(), 2);
        assert_eq!(TrackKind::from_id(2), Some(TrackKind::Video));
        assert_eq!(TrackKind::from_id(3), None);
    }

    #[test]
    fn test_track_display() {
        assert_eq!(TrackKind::Audio.to_string(), "audio");
    }
}
