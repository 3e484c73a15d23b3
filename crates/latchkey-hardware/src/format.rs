//! Text rendering of sector dumps.
//!
//! ```text
//! 01.0 | 00 11 22 33 44 55 66 77 88 99 aa bb cc dd ee ff
//! 01.1 | 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00
//! 01.2 | 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00
//!      | KeyA=000000000000 KeyB=ffffffffffff BlocksAccess=(B0: 0, B1: 0, B2: 0, B3: 1)
//! ```

use crate::types::AuthBlock;
use latchkey_core::constants::NUM_BYTES_PER_BLOCK;

/// Space separated lowercase hex.
pub fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One data block line.
pub fn fmt_block(sector: usize, block: usize, data: &[u8]) -> String {
    format!("{sector:02}.{block} | {}", hex_bytes(data))
}

/// The trailer line of a sector.
pub fn fmt_auth_block(auth: &AuthBlock) -> String {
    format!(
        "     | KeyA={} KeyB={} BlocksAccess=({})",
        auth.key_a, auth.key_b, auth.permissions
    )
}

/// All lines of a sector: one per data block, then the trailer.
///
/// `data` is the concatenation of the data blocks as returned by
/// [`read_data_blocks`](crate::traits::TagReader::read_data_blocks).
pub fn fmt_sector(sector: usize, data: &[u8], auth: &AuthBlock) -> Vec<String> {
    let mut lines: Vec<String> = data
        .chunks(NUM_BYTES_PER_BLOCK)
        .enumerate()
        .map(|(block, bytes)| fmt_block(sector, block, bytes))
        .collect();
    lines.push(fmt_auth_block(auth));
    lines
}
