//! Session counters.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters updated by session tasks.
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub streams_opened: AtomicU64,
    pub segments_sent: AtomicU64,
    pub control_streams: AtomicU64,
    pub throttles_applied: AtomicU64,
    pub bidi_rejected: AtomicU64,
    pub stream_errors: AtomicU64,
}

impl StatsCounters {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SessionStats {
        SessionStats {
            streams_opened: self.streams_opened.load(Ordering::Relaxed),
            segments_sent: self.segments_sent.load(Ordering::Relaxed),
            control_streams: self.control_streams.load(Ordering::Relaxed),
            throttles_applied: self.throttles_applied.load(Ordering::Relaxed),
            bidi_rejected: self.bidi_rejected.load(Ordering::Relaxed),
            stream_errors: self.stream_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time session statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Outbound streams opened (init and segment).
    pub streams_opened: u64,
    /// Segments fully queued onto their stream.
    pub segments_sent: u64,
    /// Inbound control streams accepted.
    pub control_streams: u64,
    /// Throttle messages that changed the network condition.
    pub throttles_applied: u64,
    /// Bidirectional streams rejected.
    pub bidi_rejected: u64,
    /// Stream-local failures contained to their stream.
    pub stream_errors: u64,
}

/// Cloneable observer of a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    counters: Arc<StatsCounters>,
}

impl SessionHandle {
    pub(crate) fn new(counters: Arc<StatsCounters>) -> Self {
        Self { counters }
    }

    /// Current statistics.
    pub fn stats(&self) -> SessionStats {
        self.counters.snapshot()
    }
}
