//! Track writers: one per track, each pushing the track's init blob and
//! then its segments onto fresh outbound streams.

use std::sync::Arc;

use tracing::{debug, warn};

use super::error::{SessionError, SessionResult};
use super::priority::{StreamPriority, timestamp_millis};
use super::stats::StatsCounters;
use super::supervisor::TaskSpawner;
use crate::core::MediaError;
use crate::media::{MediaInit, MediaSegment, TrackKind, TrackSource};
use crate::protocol::Message;
use crate::transport::{OutboundStream, StreamError, Transport};

/// Opens prioritized outbound streams and hands their drains to the
/// session's task group.
#[derive(Debug)]
pub(crate) struct StreamOpener<T> {
    transport: Arc<T>,
    spawner: TaskSpawner,
    stats: Arc<StatsCounters>,
    reset_code: u32,
}

impl<T: Transport> StreamOpener<T> {
    pub fn new(
        transport: Arc<T>,
        spawner: TaskSpawner,
        stats: Arc<StatsCounters>,
        reset_code: u32,
    ) -> Self {
        Self {
            transport,
            spawner,
            stats,
            reset_code,
        }
    }

    /// Open a stream with `priority` applied before any byte is queued.
    ///
    /// Failing to open is fatal to the session.
    async fn open(
        &self,
        kind: TrackKind,
        priority: StreamPriority,
    ) -> SessionResult<OutboundStream> {
        let send = self
            .transport
            .open_uni()
            .await
            .map_err(SessionError::Open)?;

        let (mut stream, drain) = OutboundStream::new(send);
        let value = priority.value();
        stream.set_priority(value)?;

        let stats = Arc::clone(&self.stats);
        let drain = drain.with_reset_code(self.reset_code);
        self.spawner.spawn("drain", async move {
            drain.run().await.map_err(|e| {
                StatsCounters::incr(&stats.stream_errors);
                SessionError::Stream(e)
            })
        });

        StatsCounters::incr(&self.stats.streams_opened);
        debug!(track = %kind, priority = value, "opened stream");
        Ok(stream)
    }

    /// Send `init` on its own stream, ahead of every segment.
    async fn send_init(&self, kind: TrackKind, init: &MediaInit) -> SessionResult<()> {
        let mut stream = self.open(kind, StreamPriority::Init).await?;

        let written = stream
            .write_message(&Message::init(kind.id()))
            .and_then(|()| stream.write(init.raw().clone()))
            .and_then(|()| stream.close());

        if let Err(e) = written {
            self.contain(kind, &mut stream, e);
        }
        Ok(())
    }

    /// Send one segment on its own stream, prioritized by its timestamp.
    async fn send_segment<S: MediaSegment>(
        &self,
        kind: TrackKind,
        segment: &mut S,
    ) -> SessionResult<()> {
        let timestamp = segment.timestamp();
        let mut stream = self
            .open(kind, StreamPriority::Segment(timestamp))
            .await?;

        let header = Message::segment(kind.id(), timestamp_millis(timestamp));
        if let Err(e) = stream.write_message(&header) {
            self.contain(kind, &mut stream, e);
            return Ok(());
        }

        loop {
            let chunk = match segment.read_chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    // Never finish a partial segment.
                    stream.cancel(self.reset_code);
                    return Err(media_error(kind, e));
                }
            };

            if let Err(e) = stream.write(chunk) {
                self.contain(kind, &mut stream, e);
                return Ok(());
            }
        }

        if let Err(e) = stream.close() {
            self.contain(kind, &mut stream, e);
            return Ok(());
        }

        StatsCounters::incr(&self.stats.segments_sent);
        Ok(())
    }

    fn contain(&self, kind: TrackKind, stream: &mut OutboundStream, error: StreamError) {
        warn!(track = %kind, error = %error, "abandoning stream");
        stream.cancel(self.reset_code);
    }
}

/// Copies one track from its source onto outbound streams.
#[derive(Debug)]
pub(crate) struct TrackWriter<T, M> {
    kind: TrackKind,
    source: M,
    opener: Arc<StreamOpener<T>>,
}

impl<T: Transport, M: TrackSource> TrackWriter<T, M> {
    pub fn new(kind: TrackKind, source: M, opener: Arc<StreamOpener<T>>) -> Self {
        Self {
            kind,
            source,
            opener,
        }
    }

    /// Send the init blob, then every segment until the track ends.
    ///
    /// Source failures end the writer with a fatal error. Stream failures
    /// only drop the affected stream.
    pub async fn run(mut self) -> SessionResult<()> {
        let kind = self.kind;
        let init = self
            .source
            .init()
            .await
            .map_err(|e| media_error(kind, e))?;
        self.opener.send_init(kind, &init).await?;

        while let Some(mut segment) = self
            .source
            .next_segment()
            .await
            .map_err(|e| media_error(kind, e))?
        {
            self.opener.send_segment(kind, &mut segment).await?;
        }

        debug!(track = %kind, "track finished");
        Ok(())
    }
}

fn media_error(track: TrackKind, source: MediaError) -> SessionError {
    SessionError::Media { track, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MemorySegment, MemoryTrack};
    use crate::protocol::AtomReader;
    use crate::session::supervisor::TaskGroup;
    use crate::transport::memory::{self, MemoryTransport};
    use bytes::Bytes;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio_util::sync::CancellationToken;

    struct FailingSegment;

    impl MediaSegment for FailingSegment {
        fn timestamp(&self) -> Duration {
            Duration::from_millis(30)
        }

        async fn read_chunk(&mut self) -> Result<Option<Bytes>, MediaError> {
            Err(MediaError::source("disk gone"))
        }
    }

    struct FailingTrack {
        sent: bool,
    }

    impl TrackSource for FailingTrack {
        type Segment = FailingSegment;

        async fn init(&mut self) -> Result<MediaInit, MediaError> {
            Ok(MediaInit::new(&b"init"[..]))
        }

        async fn next_segment(&mut self) -> Result<Option<FailingSegment>, MediaError> {
            if self.sent {
                return Ok(None);
            }
            self.sent = true;
            Ok(Some(FailingSegment))
        }
    }

    fn opener(
        transport: MemoryTransport,
        spawner: TaskSpawner,
    ) -> Arc<StreamOpener<MemoryTransport>> {
        Arc::new(StreamOpener::new(
            Arc::new(transport),
            spawner,
            Arc::new(StatsCounters::default()),
            4,
        ))
    }

    #[tokio::test]
    async fn test_writes_init_then_segments() {
        let (server, mut client) = memory::pair();
        let (mut group, spawner) = TaskGroup::new(CancellationToken::new());
        let opener = opener(server, spawner);

        let track = MemoryTrack::new(
            MediaInit::new(&b"ftyp-moov"[..]),
            [MemorySegment::new(
                Duration::from_millis(40),
                [&b"moof"[..], &b"mdat"[..]],
            )],
        );
        let writer = TrackWriter::new(TrackKind::Video, track, Arc::clone(&opener));
        group.add("video", writer.run());
        drop(opener);
        group.run().await.unwrap();

        let mut init = client.accept_uni().await.unwrap();
        assert_eq!(init.priority(), Some(i32::MAX));
        let mut reader = AtomReader::new(&mut init);
        assert_eq!(reader.read_message().await.unwrap(), Some(Message::init(2)));
        let mut raw = Vec::new();
        init.read_to_end(&mut raw).await.unwrap();
        assert_eq!(raw, b"ftyp-moov");

        let mut segment = client.accept_uni().await.unwrap();
        assert_eq!(segment.priority(), Some(40));
        let mut reader = AtomReader::new(&mut segment);
        assert_eq!(
            reader.read_message().await.unwrap(),
            Some(Message::segment(2, 40))
        );
        let mut body = Vec::new();
        segment.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"moofmdat");
    }

    #[tokio::test]
    async fn test_chunk_error_cancels_stream() {
        let (server, mut client) = memory::pair();
        let (mut group, spawner) = TaskGroup::new(CancellationToken::new());
        let opener = opener(server, spawner);
        let stats = Arc::clone(&opener.stats);

        let writer = TrackWriter::new(
            TrackKind::Audio,
            FailingTrack { sent: false },
            Arc::clone(&opener),
        );
        group.add("audio", writer.run());
        drop(opener);

        let err = group.run().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Media {
                track: TrackKind::Audio,
                ..
            }
        ));

        assert!(client.accept_uni().await.is_some());
        assert!(client.accept_uni().await.is_some());
        assert_eq!(stats.segments_sent.load(Ordering::Relaxed), 0);
        assert_eq!(stats.streams_opened.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_broken_source_opens_nothing() {
        let (server, mut client) = memory::pair();
        let (mut group, spawner) = TaskGroup::new(CancellationToken::new());
        let opener = opener(server, spawner);

        let writer = TrackWriter::new(
            TrackKind::Video,
            MemoryTrack::broken("no such file"),
            Arc::clone(&opener),
        );
        group.add("video", writer.run());
        drop(opener);

        assert!(group.run().await.unwrap_err().is_fatal());
        assert!(client.accept_uni().await.is_none());
    }
}
