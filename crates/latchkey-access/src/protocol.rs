//! The tag read protocol.
//!
//! A single read attempt runs against a time budget and classifies every
//! reader outcome:
//!
//! | Reader outcome | Action |
//! |---|---|
//! | identifier bytes | tag present |
//! | empty identifier | retry with the remaining budget |
//! | IRQ fault | reinitialize the reader, retry with the remaining budget |
//! | no session (an earlier reopen failed) | same as an IRQ fault |
//! | timeout | no tag |
//! | budget used up | no tag |
//! | anything else | error |

use crate::error::Result;
use latchkey_core::TagReadResult;
use latchkey_hardware::TagReader;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Read the next tag presented within `timeout`.
///
/// A timeout is not an error: it yields [`TagReadResult::absent`].
///
/// # Errors
///
/// Returns [`AccessError::Hardware`](crate::AccessError::Hardware) for
/// unclassified reader failures and when reinitializing fails. A failed
/// reinitialize leaves the reader without a session, so the next call tries
/// to open it again.
///
/// # Examples
///
/// ```
/// use latchkey_access::read_next_tag;
/// use latchkey_hardware::SharedReader;
/// use latchkey_hardware::noop::NoopReader;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> latchkey_access::Result<()> {
/// let mut reader = SharedReader::new(NoopReader::new());
/// let result = read_next_tag(&mut reader, Duration::from_secs(5)).await?;
///
/// assert!(result.is_tag_present());
/// assert_eq!(result.tag_id(), Some("00000000000000000000000000000000"));
/// # Ok(())
/// # }
/// ```
pub async fn read_next_tag<R: TagReader>(reader: &mut R, timeout: Duration) -> Result<TagReadResult> {
    let deadline = Instant::now() + timeout;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            debug!("Read budget exhausted");
            return Ok(TagReadResult::absent());
        }

        match reader.read_uid(remaining).await {
            Ok(uid) if uid.is_empty() => {
                debug!("Encountered empty UID, retrying");
            }
            Ok(uid) => {
                let result = TagReadResult::present(&uid);
                info!(tag = %result, "Successfully read tag");
                return Ok(result);
            }
            Err(e) if e.is_timeout() => {
                return Ok(TagReadResult::absent());
            }
            Err(e) if e.needs_reinitialize() => {
                warn!(error = %e, "Reader session unusable, reinitializing reader and trying again");
                reader.initialize().await?;
            }
            Err(e) => return Err(e.into()),
        }
    }
}
