//! Warp - Session Layer
//!
//! Everything that happens on one accepted connection:
//!
//! - [`Session`]: the orchestrator; accepts the session, runs the tasks
//!   below under one supervisor, closes the transport exactly once
//! - Control reader: applies `throttle` messages from inbound
//!   unidirectional streams to a [`ConditionHandle`]
//! - Track writers: send each track's init blob on a top-priority stream
//!   and every segment on its own stream, prioritized by timestamp
//! - [`TaskGroup`]: cancels everything on the first fatal error and keeps
//!   stream-local failures local
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use warp_server::media::{MediaInit, MemoryTrack};
//! use warp_server::session::{NetworkSettings, Session};
//! use warp_server::transport::memory;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (transport, _client) = memory::pair();
//! let audio = MemoryTrack::new(MediaInit::new(&b"audio"[..]), []);
//! let video = MemoryTrack::new(MediaInit::new(&b"video"[..]), []);
//!
//! let session = Session::new(Arc::new(transport), audio, video, NetworkSettings::default());
//! session.run(CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

mod condition;
mod config;
mod control;
mod error;
mod orchestrator;
mod priority;
mod stats;
mod supervisor;
mod writer;

pub use condition::{ConditionHandle, NetworkCondition, NetworkSettings};
pub use config::{FramingPolicy, SessionConfig, SessionConfigBuilder};
pub use error::{SessionError, SessionResult};
pub use orchestrator::Session;
pub use priority::{StreamPriority, timestamp_millis};
pub use stats::{SessionHandle, SessionStats};
pub use supervisor::{TaskGroup, TaskSpawner};
