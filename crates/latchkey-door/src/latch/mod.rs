//! Latches: single physical outputs (or sets of them) that unlock on command.
//!
//! Each output-owning latch runs its own task, started explicitly with
//! `spawn()`, which returns a [`LatchHandle`]. Commands reach the task
//! through a drop-on-busy [`handoff`](crate::handoff): an unlock that arrives
//! while the latch is already held open is discarded, never queued.
//!
//! | Latch | Rest level | On unlock |
//! |---|---|---|
//! | [`PulseLatch`] | high | low for the duration, then high |
//! | [`TimedLatch`] | window baseline | low for the duration, then baseline |
//! | [`MultiLatch`] | n/a | forwards to every member |

#![allow(async_fn_in_trait)]

pub mod multi;
pub mod pulse;
pub mod timed;

pub use multi::MultiLatch;
pub use pulse::PulseLatch;
pub use timed::TimedLatch;

use crate::error::Result;
use crate::handoff::{Handoff, HandoffSender};
use latchkey_hardware::{Level, OutputPin};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Request to hold a latch open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatchCommand {
    pub unlock_duration: Duration,
}

/// Anything that can be unlocked for a while.
pub trait Latch: Send + Sync {
    /// Request an unlock. Never blocks.
    ///
    /// Returns [`Handoff::Dropped`] when the latch is busy.
    fn unlock(&self, duration: Duration) -> Result<Handoff>;

    /// Stop accepting commands and wait for the latch task(s) to finish.
    ///
    /// An unlock in progress completes first.
    async fn shutdown(self)
    where
        Self: Sized;
}

/// Handle to a running latch task.
#[derive(Debug)]
pub struct LatchHandle {
    name: String,
    commands: HandoffSender<LatchCommand>,
    task: JoinHandle<()>,
}

impl LatchHandle {
    pub(crate) fn new(
        name: String,
        commands: HandoffSender<LatchCommand>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            name,
            commands,
            task,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Latch for LatchHandle {
    fn unlock(&self, duration: Duration) -> Result<Handoff> {
        let outcome = self.commands.try_handoff(LatchCommand {
            unlock_duration: duration,
        })?;

        match outcome {
            Handoff::Accepted => {
                debug!(latch = %self.name, duration_ms = duration.as_millis() as u64, "Enqueued unlock")
            }
            Handoff::Dropped => info!(latch = %self.name, "Latch busy, dropped unlock"),
        }
        Ok(outcome)
    }

    async fn shutdown(self) {
        let Self {
            name,
            commands,
            task,
        } = self;
        drop(commands);

        if let Err(e) = task.await {
            warn!(latch = %name, error = %e, "Latch task ended abnormally");
        }
    }
}

/// Enum wrapper for latch dispatch.
#[derive(Debug)]
pub enum AnyLatch {
    Single(LatchHandle),
    Multi(MultiLatch),
}

impl From<LatchHandle> for AnyLatch {
    fn from(handle: LatchHandle) -> Self {
        Self::Single(handle)
    }
}

impl From<MultiLatch> for AnyLatch {
    fn from(latch: MultiLatch) -> Self {
        Self::Multi(latch)
    }
}

impl Latch for AnyLatch {
    fn unlock(&self, duration: Duration) -> Result<Handoff> {
        match self {
            Self::Single(latch) => latch.unlock(duration),
            Self::Multi(latch) => latch.unlock(duration),
        }
    }

    async fn shutdown(self) {
        match self {
            Self::Single(latch) => latch.shutdown().await,
            Self::Multi(latch) => latch.shutdown().await,
        }
    }
}

/// Drive `pin`, logging rather than propagating failures.
///
/// A latch task has no caller to report to; it keeps serving commands.
pub(crate) fn drive(pin: &mut impl OutputPin, level: Level) {
    if let Err(e) = pin.set_level(level) {
        error!(pin = %pin.name(), %level, error = %e, "Failed to drive latch output");
    }
}
