//! Core constants and error types for Warp.

pub mod constants;
mod error;

pub use constants::*;
pub use error::*;
