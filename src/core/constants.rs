//! Protocol constants for Warp.
//!
//! These values are fixed by the wire protocol and MUST NOT be changed.

// =============================================================================
// ATOM FRAMING
// =============================================================================

/// Atom header size (32-bit big-endian size + 4-byte tag).
pub const ATOM_HEADER_SIZE: usize = 8;

/// Smallest valid atom size (header only, empty payload).
pub const MIN_ATOM_SIZE: u32 = ATOM_HEADER_SIZE as u32;

/// Largest atom accepted on a control stream, header included.
///
/// Arbitrary ceiling that bounds the memory held per atom. Not negotiable.
pub const MAX_ATOM_SIZE: u32 = 42069;

/// The only atom tag understood by this protocol version.
pub const WARP_TAG: [u8; 4] = *b"warp";

// =============================================================================
// TRACKS
// =============================================================================

/// Track id of the audio track.
pub const AUDIO_TRACK_ID: u32 = 1;

/// Track id of the video track.
pub const VIDEO_TRACK_ID: u32 = 2;

// =============================================================================
// STREAM CODES AND PRIORITIES
// =============================================================================

/// Error code used to reset or stop streams the protocol rejects.
pub const DEFAULT_RESET_CODE: u32 = 1;

/// Application close code for a session that ended cleanly.
pub const DEFAULT_CLOSE_CODE: u32 = 0;

/// Application close code for a session that ended on a fatal error.
pub const DEFAULT_ERROR_CLOSE_CODE: u32 = 1;

/// Priority of init streams. Higher values are serviced first.
pub const INIT_PRIORITY: i32 = i32::MAX;

/// Highest priority a segment stream may carry, strictly below [`INIT_PRIORITY`].
pub const MAX_SEGMENT_PRIORITY: i32 = INIT_PRIORITY - 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_bounds() {
        assert_eq!(MIN_ATOM_SIZE, 8);
        assert_eq!(MAX_ATOM_SIZE, 42069);
        assert_eq!(&WARP_TAG, b"warp");
    }

    #[test]
    fn test_init_outranks_segments() {
        assert!(INIT_PRIORITY > MAX_SEGMENT_PRIORITY);
    }
}
