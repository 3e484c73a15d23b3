//! Doors: the two authorization signals and the latches behind them.
//!
//! ```text
//!  auth_ok()   ──handoff──► ok dispatch task   ──unlock(d)──► ok latch
//!  auth_fail() ──handoff──► fail dispatch task ──unlock(d)──► fail latch
//! ```
//!
//! Signals are fire-and-forget: the caller never waits for a latch. Each
//! signal has its own dispatch task so a held fail latch never delays an
//! authorized entry.

#![allow(async_fn_in_trait)]

use crate::error::Result;
use crate::handoff::{self, Handoff, HandoffReceiver, HandoffSender};
use crate::latch::{AnyLatch, Latch};
use latchkey_core::constants::DEFAULT_UNLOCK_MS;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A door driven by authorization outcomes.
pub trait Door: Send + Sync {
    /// Signal a successful authorization.
    fn auth_ok(&self) -> Result<Handoff>;

    /// Signal a rejected tag.
    fn auth_fail(&self) -> Result<Handoff>;

    fn describe(&self) -> String;

    /// Stop accepting signals and wait for in-flight unlocks to finish.
    async fn shutdown(self)
    where
        Self: Sized;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    AuthOk,
    AuthFail,
}

impl Signal {
    fn as_str(&self) -> &'static str {
        match self {
            Self::AuthOk => "AuthOK",
            Self::AuthFail => "AuthFail",
        }
    }
}

/// Door backed by latches, one dispatch task per signal.
#[derive(Debug)]
pub struct LatchDoor {
    ok: HandoffSender<()>,
    fail: HandoffSender<()>,
    tasks: Vec<JoinHandle<()>>,
}

impl LatchDoor {
    /// Start the dispatch tasks.
    ///
    /// `fail_latch` may be absent, in which case `auth_fail` only logs.
    pub fn spawn(
        ok_latch: AnyLatch,
        fail_latch: Option<AnyLatch>,
        unlock_duration: Duration,
    ) -> Self {
        let (ok, ok_rx) = handoff::channel();
        let (fail, fail_rx) = handoff::channel();

        let tasks = vec![
            tokio::spawn(dispatch(Signal::AuthOk, ok_rx, Some(ok_latch), unlock_duration)),
            tokio::spawn(dispatch(Signal::AuthFail, fail_rx, fail_latch, unlock_duration)),
        ];

        Self { ok, fail, tasks }
    }

    fn signal(&self, signal: Signal) -> Result<Handoff> {
        let sender = match signal {
            Signal::AuthOk => &self.ok,
            Signal::AuthFail => &self.fail,
        };

        let outcome = sender.try_handoff(())?;
        match outcome {
            Handoff::Accepted => debug!(signal = signal.as_str(), "Enqueued signal"),
            Handoff::Dropped => warn!(signal = signal.as_str(), "Failed to enqueue signal"),
        }
        Ok(outcome)
    }
}

async fn dispatch(
    signal: Signal,
    mut signals: HandoffReceiver<()>,
    latch: Option<AnyLatch>,
    unlock_duration: Duration,
) {
    while signals.recv().await.is_some() {
        info!(signal = signal.as_str(), "Signal received");
        if let Some(latch) = &latch
            && let Err(e) = latch.unlock(unlock_duration)
        {
            warn!(signal = signal.as_str(), error = %e, "Failed to unlock");
        }
    }

    if let Some(latch) = latch {
        latch.shutdown().await;
    }
    debug!(signal = signal.as_str(), "Dispatch task stopped");
}

impl Door for LatchDoor {
    fn auth_ok(&self) -> Result<Handoff> {
        self.signal(Signal::AuthOk)
    }

    fn auth_fail(&self) -> Result<Handoff> {
        self.signal(Signal::AuthFail)
    }

    fn describe(&self) -> String {
        "LatchDoor".to_string()
    }

    async fn shutdown(self) {
        let Self { ok, fail, tasks } = self;
        drop(ok);
        drop(fail);

        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Door dispatch task ended abnormally");
            }
        }
        info!("Door shut down");
    }
}

/// Door that drives nothing and counts signals.
#[derive(Debug, Clone, Default)]
pub struct NoopDoor {
    ok_count: Arc<AtomicUsize>,
    fail_count: Arc<AtomicUsize>,
}

impl NoopDoor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok_count(&self) -> usize {
        self.ok_count.load(Ordering::SeqCst)
    }

    pub fn fail_count(&self) -> usize {
        self.fail_count.load(Ordering::SeqCst)
    }
}

impl Door for NoopDoor {
    fn auth_ok(&self) -> Result<Handoff> {
        self.ok_count.fetch_add(1, Ordering::SeqCst);
        info!("Opening AuthOK (noop)");
        Ok(Handoff::Accepted)
    }

    fn auth_fail(&self) -> Result<Handoff> {
        self.fail_count.fetch_add(1, Ordering::SeqCst);
        info!("Opening AuthFail (noop)");
        Ok(Handoff::Accepted)
    }

    fn describe(&self) -> String {
        "NoopDoor".to_string()
    }

    async fn shutdown(self) {}
}

/// Enum wrapper for door dispatch.
#[derive(Debug)]
pub enum AnyDoor {
    Latch(LatchDoor),
    Noop(NoopDoor),
}

impl From<LatchDoor> for AnyDoor {
    fn from(door: LatchDoor) -> Self {
        Self::Latch(door)
    }
}

impl From<NoopDoor> for AnyDoor {
    fn from(door: NoopDoor) -> Self {
        Self::Noop(door)
    }
}

impl Door for AnyDoor {
    fn auth_ok(&self) -> Result<Handoff> {
        match self {
            Self::Latch(door) => door.auth_ok(),
            Self::Noop(door) => door.auth_ok(),
        }
    }

    fn auth_fail(&self) -> Result<Handoff> {
        match self {
            Self::Latch(door) => door.auth_fail(),
            Self::Noop(door) => door.auth_fail(),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Latch(door) => door.describe(),
            Self::Noop(door) => door.describe(),
        }
    }

    async fn shutdown(self) {
        match self {
            Self::Latch(door) => door.shutdown().await,
            Self::Noop(door) => door.shutdown().await,
        }
    }
}

/// Door timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorConfig {
    pub unlock_duration: Duration,
}

impl Default for DoorConfig {
    fn default() -> Self {
        Self {
            unlock_duration: Duration::from_millis(DEFAULT_UNLOCK_MS),
        }
    }
}

impl DoorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how long a latch is held open per signal.
    pub fn unlock_duration(mut self, duration: Duration) -> Self {
        self.unlock_duration = duration;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latch::PulseLatch;
    use latchkey_hardware::Level;
    use latchkey_hardware::mock::MockPin;

    #[tokio::test]
    async fn test_noop_door_counts() {
        let door = NoopDoor::new();
        door.auth_ok().unwrap();
        door.auth_ok().unwrap();
        door.auth_fail().unwrap();

        assert_eq!(door.ok_count(), 2);
        assert_eq!(door.fail_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_signals_reach_their_own_latch() {
        let (main, main_handle) = MockPin::new("main");
        let (fail, fail_handle) = MockPin::new("fail");
        let door = LatchDoor::spawn(
            PulseLatch::new(main).spawn().into(),
            Some(PulseLatch::new(fail).spawn().into()),
            Duration::from_secs(3),
        );
        tokio::task::yield_now().await;

        door.auth_fail().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fail_handle.level(), Some(Level::Low));
        assert_eq!(main_handle.level(), Some(Level::High));

        // The fail latch is held; an authorized entry still goes through.
        door.auth_ok().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(main_handle.level(), Some(Level::Low));

        door.shutdown().await;
        assert_eq!(main_handle.level(), Some(Level::High));
        assert_eq!(fail_handle.level(), Some(Level::High));
    }

    #[tokio::test]
    async fn test_door_config_builder() {
        assert_eq!(DoorConfig::default().unlock_duration, Duration::from_secs(3));
        let config = DoorConfig::new().unlock_duration(Duration::from_millis(500));
        assert_eq!(config.unlock_duration, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_missing_fail_latch_only_logs() {
        let (main, main_handle) = MockPin::new("main");
        let door = LatchDoor::spawn(PulseLatch::new(main).spawn().into(), None, Duration::from_millis(1));
        tokio::task::yield_now().await;

        assert!(door.auth_fail().is_ok());
        door.shutdown().await;
        assert_eq!(main_handle.low_count(), 0);
    }
}
