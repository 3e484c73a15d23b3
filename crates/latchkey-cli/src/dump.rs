//! Sector dump of the tag in front of the reader.
//!
//! Reads every sector with the transport key and prints the data blocks and
//! the trailer. An IRQ fault, or a reader left without a session, reopens the
//! reader session. A failed reopen counts as a failed attempt. A sector that
//! keeps failing is skipped after `max_attempts` tries.

use latchkey_core::constants::NUM_SECTORS;
use latchkey_hardware::format::fmt_sector;
use latchkey_hardware::{AuthBlock, Result as HardwareResult, TagReader};
use std::io::Write;
use std::time::Duration;
use tracing::{error, info, warn};

/// Outcome of a dump.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpSummary {
    pub sectors_read: usize,
    pub skipped: Vec<usize>,
    pub reinitializations: usize,
}

/// Dump all sectors to `out`, each followed by a blank line.
///
/// The reader must already be initialized.
pub async fn dump_tag<R: TagReader>(
    reader: &mut R,
    timeout: Duration,
    max_attempts: usize,
    out: &mut impl Write,
) -> anyhow::Result<DumpSummary> {
    let mut summary = DumpSummary::default();
    let max_attempts = max_attempts.max(1);

    for sector in 0..NUM_SECTORS {
        let mut dumped = false;

        for attempt in 1..=max_attempts {
            match read_sector(reader, timeout, sector).await {
                Ok((data, auth)) => {
                    for line in fmt_sector(sector, &data, &auth) {
                        writeln!(out, "{line}")?;
                    }
                    writeln!(out)?;
                    dumped = true;
                    break;
                }
                Err(e) => {
                    warn!(sector, attempt, error = %e, "Failed to read sector");
                    if e.needs_reinitialize() {
                        summary.reinitializations += 1;
                        if let Err(e) = reader.initialize().await {
                            warn!(sector, attempt, error = %e, "Failed to reinitialize reader");
                        }
                    }
                }
            }
        }

        if dumped {
            summary.sectors_read += 1;
        } else {
            error!(sector, max_attempts, "Giving up on sector");
            summary.skipped.push(sector);
        }
    }

    info!(
        sectors_read = summary.sectors_read,
        skipped = summary.skipped.len(),
        "Dump finished"
    );
    Ok(summary)
}

async fn read_sector<R: TagReader>(
    reader: &mut R,
    timeout: Duration,
    sector: usize,
) -> HardwareResult<(Vec<u8>, AuthBlock)> {
    let data = reader.read_data_blocks(timeout, sector).await?;
    let auth = reader.read_auth_block(timeout, sector).await?;
    Ok((data, auth))
}
