//! Stream priority assignment.
//!
//! Init streams always outrank segment streams: playback cannot start
//! without them. Segment streams take their timestamp in milliseconds as
//! priority, so under congestion the freshest segment goes first and stale
//! ones starve. Timestamps are used verbatim, with no smoothing, even when a
//! source produces them out of order.

use std::time::Duration;

use crate::core::{INIT_PRIORITY, MAX_SEGMENT_PRIORITY};

/// Kind of outbound stream being prioritized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPriority {
    /// Stream carrying a track's init blob.
    Init,
    /// Stream carrying a segment at the given timestamp.
    Segment(Duration),
}

impl StreamPriority {
    /// Transport priority value. Higher is serviced first.
    pub fn value(self) -> i32 {
        match self {
            Self::Init => INIT_PRIORITY,
            Self::Segment(timestamp) => i32::try_from(timestamp.as_millis())
                .unwrap_or(MAX_SEGMENT_PRIORITY)
                .min(MAX_SEGMENT_PRIORITY),
        }
    }
}

/// Timestamp in whole milliseconds, as carried in segment headers.
pub fn timestamp_millis(timestamp: Duration) -> u64 {
    u64::try_from(timestamp.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_max() {
        assert_eq!(StreamPriority::Init.value(), i32::MAX);
    }

    #[test]
    fn test_segment_is_timestamp() {
        assert_eq!(
            StreamPriority::Segment(Duration::from_millis(100)).value(),
            100
        );
        assert_eq!(
            StreamPriority::Segment(Duration::from_micros(50_999)).value(),
            50
        );
        assert_eq!(StreamPriority::Segment(Duration::ZERO).value(), 0);
    }

    #[test]
    fn test_init_outranks_every_segment() {
        for ms in [0, 1, 1 << 20, (1 << 30) - 1, i32::MAX as u64, u64::MAX / 2] {
            let segment = StreamPriority::Segment(Duration::from_millis(ms)).value();
            assert!(StreamPriority::Init.value() > segment, "ms = {ms}");
        }
    }

    #[test]
    fn test_order_is_not_smoothed() {
        let priorities: Vec<i32> = [100, 50, 200]
            .into_iter()
            .map(|ms| StreamPriority::Segment(Duration::from_millis(ms)).value())
            .collect();
        assert_eq!(priorities, [100, 50, 200]);
    }

    #[test]
    fn test_timestamp_millis() {
        assert_eq!(timestamp_millis(Duration::from_secs(4)), 4000);
    }
}
