//! Warp wire protocol.
//!
//! - **Atom codec**: [`AtomHeader`], [`encode_atom`], [`decode_header`]
//! - **Messages**: [`Message`] with its [`InitMessage`], [`SegmentMessage`]
//!   and [`Throttle`] variants
//! - **Async reader**: [`AtomReader`] (requires `transport` feature)

mod atom;
mod message;
#[cfg(feature = "transport")]
mod reader;

pub use atom::*;
pub use message::*;
#[cfg(feature = "transport")]
pub use reader::AtomReader;
