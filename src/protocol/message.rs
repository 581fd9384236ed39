//! Warp messages carried in atom payloads.
//!
//! On the wire a message is a JSON object with exactly one key naming the
//! variant:
//!
//! ```text
//! {"init":     {"id": 1}}
//! {"segment":  {"init": 2, "timestamp": 4000}}
//! {"throttle": {"rate": 1000, "buffer": 4096, "loss": 0.1}}
//! ```
//!
//! Decoding is lenient the way older peers expect: unknown keys are
//! skipped, and an object with no known key (including `{}` or a `null`
//! variant) decodes to no message at all. If several known keys are present
//! only one is kept, checked in the order `throttle`, `init`, `segment`.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::atom::encode_atom;
use crate::core::{MessageError, WARP_TAG};

/// Header of a stream carrying a track's init blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitMessage {
    /// Track id (1 = audio, 2 = video).
    pub id: u32,
}

/// Header of a stream carrying one media segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentMessage {
    /// Track id of the init blob this segment decodes against.
    pub init: u32,
    /// Presentation timestamp in milliseconds since track start.
    pub timestamp: u64,
}

/// Network simulation directive sent by the client.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Throttle {
    /// Write rate limit.
    pub rate: u64,
    /// Write buffer size.
    pub buffer: u64,
    /// Fraction of writes to drop, in `[0, 1]`.
    pub loss: f64,
}

impl Throttle {
    /// Check the loss fraction is a probability.
    pub fn validate(&self) -> Result<(), MessageError> {
        if !(0.0..=1.0).contains(&self.loss) {
            return Err(MessageError::InvalidLoss(self.loss));
        }
        Ok(())
    }
}

/// A decoded Warp message. Exactly one variant is active.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Message {
    /// Init stream header.
    Init(InitMessage),
    /// Segment stream header.
    Segment(SegmentMessage),
    /// Control directive.
    Throttle(Throttle),
}

/// Inbound wire form: every variant optional, unknown keys ignored.
#[derive(Debug, Deserialize)]
struct Envelope {
    init: Option<InitMessage>,
    segment: Option<SegmentMessage>,
    throttle: Option<Throttle>,
}

impl Message {
    /// Init header for track `id`.
    pub fn init(id: u32) -> Self {
        Self::Init(InitMessage { id })
    }

    /// Segment header for track `init` at `timestamp` milliseconds.
    pub fn segment(init: u32, timestamp: u64) -> Self {
        Self::Segment(SegmentMessage { init, timestamp })
    }

    /// Throttle directive.
    pub fn throttle(rate: u64, buffer: u64, loss: f64) -> Self {
        Self::Throttle(Throttle { rate, buffer, loss })
    }

    /// Encode as a JSON payload.
    pub fn to_payload(&self) -> Result<Vec<u8>, MessageError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode from a JSON payload.
    ///
    /// Returns `Ok(None)` for an object carrying no known message.
    pub fn from_payload(payload: &[u8]) -> Result<Option<Self>, MessageError> {
        let envelope: Envelope = serde_json::from_slice(payload)?;

        if let Some(throttle) = envelope.throttle {
            throttle.validate()?;
            return Ok(Some(Self::Throttle(throttle)));
        }
        Ok(envelope
            .init
            .map(Self::Init)
            .or_else(|| envelope.segment.map(Self::Segment)))
    }

    /// Encode as a complete `warp` atom.
    pub fn to_atom(&self) -> Result<Bytes, MessageError> {
        let payload = self.to_payload()?;
        Ok(encode_atom(WARP_TAG, &payload)?)
    }
}
