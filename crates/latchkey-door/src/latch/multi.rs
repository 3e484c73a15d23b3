//! Composite latch forwarding every unlock to an ordered set of latches.

use super::{Latch, LatchHandle};
use crate::error::Result;
use crate::handoff::Handoff;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct MultiLatch {
    latches: Vec<LatchHandle>,
}

impl MultiLatch {
    pub fn new(latches: Vec<LatchHandle>) -> Self {
        Self { latches }
    }

    pub fn len(&self) -> usize {
        self.latches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latches.is_empty()
    }
}

impl Latch for MultiLatch {
    /// Forward to every member in order.
    ///
    /// A busy member is not a failure. The result is `Accepted` if any member
    /// took the command. If forwarding to a member fails the remaining
    /// members are still tried and the first error is returned.
    fn unlock(&self, duration: Duration) -> Result<Handoff> {
        debug!(
            latches = self.latches.len(),
            duration_ms = duration.as_millis() as u64,
            "Forwarding unlock to all latches"
        );

        let mut accepted = false;
        let mut first_error = None;
        for latch in &self.latches {
            match latch.unlock(duration) {
                Ok(outcome) => accepted |= outcome.is_accepted(),
                Err(e) => {
                    warn!(latch = %latch.name(), error = %e, "Failed to forward unlock");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None if accepted => Ok(Handoff::Accepted),
            None => Ok(Handoff::Dropped),
        }
    }

    async fn shutdown(self) {
        for latch in self.latches {
            latch.shutdown().await;
        }
    }
}
