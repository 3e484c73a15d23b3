//! Geometry and timing constants.
//!
//! The tag geometry matches a MIFARE Classic 1K card: 16 sectors of 4 blocks
//! each, where the last block of every sector is the trailer holding the two
//! keys and the access bits.
//!
//! ```text
//! Sector | Block 0 | Block 1 | Block 2 | Block 3 (trailer)
//! -------+---------+---------+---------+--------------------------
//!   00   |  data   |  data   |  data   | KeyA | access | KeyB
//!   ..   |   ..    |   ..    |   ..    |  ..
//!   15   |  data   |  data   |  data   | KeyA | access | KeyB
//! ```

// ============================================================================
// Tag geometry
// ============================================================================

/// Number of sectors on a MIFARE Classic 1K card.
pub const NUM_SECTORS: usize = 16;

/// Number of data blocks per sector (the trailer is not counted).
pub const NUM_DATA_BLOCKS_PER_SECTOR: usize = 3;

/// Number of bytes in every block, data or trailer.
pub const NUM_BYTES_PER_BLOCK: usize = 16;

/// Number of bytes in the data region of one sector.
pub const NUM_DATA_BYTES_PER_SECTOR: usize = NUM_DATA_BLOCKS_PER_SECTOR * NUM_BYTES_PER_BLOCK;

/// Length of a sector key (KeyA or KeyB) in bytes.
pub const KEY_LENGTH: usize = 6;

/// Factory transport key shipped on blank cards.
///
/// Every sector read uses this single pre-agreed key.
pub const DEFAULT_KEY: [u8; KEY_LENGTH] = [0xFF; KEY_LENGTH];

/// Length of the identifier returned by the inert reader.
pub const NOOP_UID_LENGTH: usize = 16;

// ============================================================================
// Reader configuration
// ============================================================================

/// Antenna gain applied when a reader session is opened (0-7, 7 = max).
pub const DEFAULT_ANTENNA_GAIN: u8 = 7;

// ============================================================================
// Timing (milliseconds)
// ============================================================================

/// Timeout for one background poll of the reader.
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 3_000;

/// Pause after a door signal before the next poll.
///
/// Door signals return immediately, so without this pause a tag left in
/// front of the reader would re-trigger the door on every poll.
pub const DEFAULT_SETTLE_MS: u64 = 3_000;

/// Pause after a failed poll (reader link down) before trying again.
pub const DEFAULT_ERROR_BACKOFF_MS: u64 = 1_000;

/// How long a latch is held open by one unlock pulse.
pub const DEFAULT_UNLOCK_MS: u64 = 3_000;

/// Timeout for a single on-demand read requested over HTTP.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 5_000;

/// Timeout for each sector read performed by the dump tool.
pub const DEFAULT_DUMP_TIMEOUT_MS: u64 = 5_000;
