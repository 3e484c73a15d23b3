//! Common types shared across reader and latch implementations.
//!
//! This module defines output levels for latch pins and the decoded form of
//! a sector trailer (two keys plus access bits).

use latchkey_core::constants::{DEFAULT_KEY, KEY_LENGTH, NUM_BYTES_PER_BLOCK};
use latchkey_core::encode_hex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Digital output level of a pin.
///
/// Latches rest at [`Level::High`] (locked) and are pulsed to
/// [`Level::Low`] to release the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    /// Output driven low (unlocked).
    Low,

    /// Output driven high (locked).
    High,
}

impl Level {
    /// Value written to a sysfs `value` file.
    pub fn as_sysfs(&self) -> &'static str {
        match self {
            Self::Low => "0",
            Self::High => "1",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::High => write!(f, "High"),
        }
    }
}

/// Six byte sector key (KeyA or KeyB).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectorKey([u8; KEY_LENGTH]);

impl SectorKey {
    /// Factory transport key, `ffffffffffff`.
    pub const DEFAULT: SectorKey = SectorKey(DEFAULT_KEY);

    /// All-zero key.
    pub const ZERO: SectorKey = SectorKey([0; KEY_LENGTH]);

    pub fn new(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }
}

impl Default for SectorKey {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for SectorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_hex(&self.0))
    }
}

/// Access conditions of the four blocks of a sector.
///
/// Each entry is the 3-bit value `C1 C2 C3` from the trailer's access bytes,
/// with C1 as the most significant bit. `0` means any key may read and write;
/// `7` means the block is locked for everyone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlocksAccess {
    pub b0: u8,
    pub b1: u8,
    pub b2: u8,
    pub b3: u8,
}

impl BlocksAccess {
    /// Decode the access bits stored in trailer bytes 6..9.
    ///
    /// ```text
    /// byte 7: C1(b3 b2 b1 b0) | !C3(b3 b2 b1 b0)
    /// byte 8: C3(b3 b2 b1 b0) |  C2(b3 b2 b1 b0)
    /// ```
    ///
    /// # Examples
    ///
    /// ```
    /// use latchkey_hardware::types::BlocksAccess;
    ///
    /// // Transport configuration FF 07 80
    /// let mut trailer = [0u8; 16];
    /// trailer[6..9].copy_from_slice(&[0xFF, 0x07, 0x80]);
    ///
    /// let access = BlocksAccess::from_trailer(&trailer);
    /// assert_eq!(access.to_string(), "B0: 0, B1: 0, B2: 0, B3: 1");
    /// ```
    pub fn from_trailer(trailer: &[u8; NUM_BYTES_PER_BLOCK]) -> Self {
        let (b7, b8) = (trailer[7], trailer[8]);
        let condition = |block: u8| {
            let c1 = (b7 >> (4 + block)) & 1;
            let c2 = (b8 >> block) & 1;
            let c3 = (b8 >> (4 + block)) & 1;
            (c1 << 2) | (c2 << 1) | c3
        };

        Self {
            b0: condition(0),
            b1: condition(1),
            b2: condition(2),
            b3: condition(3),
        }
    }
}

impl fmt::Display for BlocksAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "B0: {}, B1: {}, B2: {}, B3: {}",
            self.b0, self.b1, self.b2, self.b3
        )
    }
}

/// Decoded sector trailer: the two keys and the access bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthBlock {
    pub key_a: SectorKey,
    pub key_b: SectorKey,
    pub permissions: BlocksAccess,
}

impl AuthBlock {
    /// Split a raw 16-byte trailer into keys and access bits.
    ///
    /// KeyA occupies bytes 0..6 and KeyB bytes 10..16. Most cards never
    /// reveal KeyA and return zeros in its place.
    pub fn from_trailer(trailer: &[u8; NUM_BYTES_PER_BLOCK]) -> Self {
        let mut key_a = [0u8; KEY_LENGTH];
        key_a.copy_from_slice(&trailer[0..6]);

        let mut key_b = [0u8; KEY_LENGTH];
        key_b.copy_from_slice(&trailer[10..16]);

        Self {
            key_a: SectorKey::new(key_a),
            key_b: SectorKey::new(key_b),
            permissions: BlocksAccess::from_trailer(trailer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_level_display() {
        assert_eq!(Level::Low.to_string(), "Low");
        assert_eq!(Level::High.to_string(), "High");
        assert_eq!(Level::High.as_sysfs(), "1");
    }

    #[test]
    fn test_sector_key_display() {
        assert_eq!(SectorKey::DEFAULT.to_string(), "ffffffffffff");
        assert_eq!(SectorKey::ZERO.to_string(), "000000000000");
        assert_eq!(
            SectorKey::new([0x06, 0x05, 0x04, 0x03, 0x02, 0x01]).to_string(),
            "060504030201"
        );
    }

    #[rstest]
    // every block "never"
    #[case([0x00, 0xF0, 0xFF], (7, 7, 7, 7))]
    // every block open
    #[case([0xFF, 0x0F, 0x00], (0, 0, 0, 0))]
    // transport configuration
    #[case([0xFF, 0x07, 0x80], (0, 0, 0, 1))]
    // B0 = 100, B1 = 010, B2 = 001, B3 = 011
    #[case([0x5E, 0x13, 0xCA], (4, 2, 1, 3))]
    fn test_blocks_access_decoding(#[case] bits: [u8; 3], #[case] expected: (u8, u8, u8, u8)) {
        let mut trailer = [0u8; 16];
        trailer[6..9].copy_from_slice(&bits);

        let access = BlocksAccess::from_trailer(&trailer);
        assert_eq!((access.b0, access.b1, access.b2, access.b3), expected);
    }

    #[test]
    fn test_auth_block_from_trailer() {
        let trailer = [
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // KeyA (hidden)
            0xFF, 0x07, 0x80, 0x69, // access bits + user byte
            0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, // KeyB
        ];

        let auth = AuthBlock::from_trailer(&trailer);
        assert_eq!(auth.key_a, SectorKey::ZERO);
        assert_eq!(auth.key_b, SectorKey::DEFAULT);
        assert_eq!(auth.permissions.b3, 1);
    }

    #[test]
    fn test_level_serialization() {
        let json = serde_json::to_string(&Level::Low).unwrap();
        let level: Level = serde_json::from_str(&json).unwrap();
        assert_eq!(level, Level::Low);
    }
}
