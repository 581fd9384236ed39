//! Session orchestrator.
//!
//! One [`Session`] serves one accepted connection. It runs four long-lived
//! tasks under a single [`TaskGroup`]:
//!
//! - `bidi`: rejects every bidirectional stream the peer opens
//! - `uni`: accepts control streams, one `control` task each
//! - `audio` / `video`: the track writers, which open one stream for the
//!   init blob and one per segment, each drained by its own `drain` task
//!
//! The session ends when canceled or when any task fails fatally. Either
//! way the transport is closed exactly once.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::condition::{ConditionHandle, NetworkCondition, NetworkSettings};
use super::config::SessionConfig;
use super::control::read_control;
use super::error::{SessionError, SessionResult};
use super::stats::{SessionHandle, StatsCounters};
use super::supervisor::{TaskGroup, TaskSpawner};
use super::writer::{StreamOpener, TrackWriter};
use crate::media::{TrackKind, TrackSource};
use crate::transport::{RecvStream, Transport};

/// A single live-media session over one transport connection.
#[derive(Debug)]
pub struct Session<T, M, C = NetworkSettings> {
    transport: Arc<T>,
    audio: M,
    video: M,
    condition: ConditionHandle<C>,
    config: SessionConfig,
    stats: Arc<StatsCounters>,
}

impl<T, M, C> Session<T, M, C>
where
    T: Transport,
    M: TrackSource,
    C: NetworkCondition,
{
    /// Create a session with the default configuration.
    pub fn new(transport: Arc<T>, audio: M, video: M, condition: C) -> Self {
        Self {
            transport,
            audio,
            video,
            condition: ConditionHandle::new(condition),
            config: SessionConfig::default(),
            stats: Arc::new(StatsCounters::default()),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Handle to the network condition throttle messages drive.
    pub fn condition(&self) -> ConditionHandle<C> {
        self.condition.clone()
    }

    /// Observer for this session's statistics.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle::new(Arc::clone(&self.stats))
    }

    /// Get the transport.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Run the session until `cancel` fires or a task fails fatally.
    ///
    /// The transport is closed exactly once before this returns, with the
    /// configured close code on success and the error close code plus the
    /// error message otherwise. Dropping the future also closes it.
    pub async fn run(self, cancel: CancellationToken) -> SessionResult<()> {
        let mut closer = Closer {
            transport: Arc::clone(&self.transport),
            close_code: self.config.close_code,
            error_close_code: self.config.error_close_code,
            closed: false,
        };

        let result = self.serve(cancel).await;
        closer.close(&result);

        match &result {
            Ok(()) => info!("session finished"),
            Err(e) => info!(error = %e, "session ended"),
        }
        result
    }

    async fn serve(self, cancel: CancellationToken) -> SessionResult<()> {
        self.transport
            .accept_session()
            .await
            .map_err(SessionError::Handshake)?;
        info!("session accepted");

        let (mut group, spawner) = TaskGroup::new(cancel.child_token());
        let shared = Arc::new(Shared {
            transport: self.transport,
            condition: self.condition,
            config: self.config,
            stats: self.stats,
        });
        let opener = Arc::new(StreamOpener::new(
            Arc::clone(&shared.transport),
            spawner.clone(),
            Arc::clone(&shared.stats),
            shared.config.reset_code,
        ));

        group.add("bidi", reject_bidi(Arc::clone(&shared)));
        group.add("uni", accept_control(Arc::clone(&shared), spawner));
        group.add(
            "audio",
            TrackWriter::new(TrackKind::Audio, self.audio, Arc::clone(&opener)).run(),
        );
        group.add(
            "video",
            TrackWriter::new(TrackKind::Video, self.video, opener).run(),
        );

        group.run().await
    }
}

#[derive(Debug)]
struct Shared<T, C> {
    transport: Arc<T>,
    condition: ConditionHandle<C>,
    config: SessionConfig,
    stats: Arc<StatsCounters>,
}

async fn reject_bidi<T, C>(shared: Arc<Shared<T, C>>) -> SessionResult<()>
where
    T: Transport,
    C: NetworkCondition,
{
    let code = shared.config.reset_code;
    loop {
        let (_send, mut recv) = shared
            .transport
            .accept_bi()
            .await
            .map_err(SessionError::AcceptBi)?;

        recv.stop(code);
        StatsCounters::incr(&shared.stats.bidi_rejected);
        warn!(code, "rejected bidirectional stream");
    }
}

async fn accept_control<T, C>(shared: Arc<Shared<T, C>>, spawner: TaskSpawner) -> SessionResult<()>
where
    T: Transport,
    C: NetworkCondition,
{
    loop {
        let stream = shared
            .transport
            .accept_uni()
            .await
            .map_err(SessionError::AcceptUni)?;

        StatsCounters::incr(&shared.stats.control_streams);
        debug!("accepted control stream");

        let shared = Arc::clone(&shared);
        spawner.spawn("control", async move {
            read_control(stream, &shared.condition, &shared.config, &shared.stats).await
        });
    }
}

/// Closes the transport once, on the first of `close` or drop.
struct Closer<T: Transport> {
    transport: Arc<T>,
    close_code: u32,
    error_close_code: u32,
    closed: bool,
}

impl<T: Transport> Closer<T> {
    fn close(&mut self, result: &SessionResult<()>) {
        if self.closed {
            return;
        }
        self.closed = true;

        match result {
            Ok(()) => self.transport.close(self.close_code, ""),
            Err(e) => self.transport.close(self.error_close_code, &e.to_string()),
        }
    }
}

impl<T: Transport> Drop for Closer<T> {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            self.transport.close(self.error_close_code, "session dropped");
        }
    }
}
