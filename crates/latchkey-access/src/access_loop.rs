//! Background loop turning presented tags into door signals.
//!
//! ```text
//!  ┌──► read_next_tag(poll_timeout) ── no tag ──┐
//!  │          │ tag                             │
//!  │          ▼                                 │
//!  │    is_access_allowed(id) ── error, backoff ┤
//!  │          │                                 │
//!  │     auth_ok / auth_fail                    │
//!  │          │                                 │
//!  └──── sleep(settle) ◄────────────────────────┘
//! ```
//!
//! The loop is started explicitly with [`AccessLoop::spawn`] and stopped
//! through its [`CancellationToken`]. Cancellation interrupts a pending read
//! or sleep; a lookup or door signal already in progress completes first.

use crate::protocol::read_next_tag;
use latchkey_core::AccessAuthorizer;
use latchkey_core::constants::{
    DEFAULT_ERROR_BACKOFF_MS, DEFAULT_POLL_TIMEOUT_MS, DEFAULT_SETTLE_MS,
};
use latchkey_door::Door;
use latchkey_hardware::SharedReader;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Timing of the access decision loop.
///
/// # Examples
///
/// ```
/// use latchkey_access::AccessLoopConfig;
/// use std::time::Duration;
///
/// let config = AccessLoopConfig::new()
///     .poll_timeout(Duration::from_secs(1))
///     .settle(Duration::from_secs(2));
///
/// assert_eq!(config.poll_timeout, Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessLoopConfig {
    /// Budget of each tag read.
    pub poll_timeout: Duration,

    /// Pause after a door signal, so one presentation yields one signal.
    pub settle: Duration,

    /// Pause after a reader or lookup failure.
    pub error_backoff: Duration,
}

impl Default for AccessLoopConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(DEFAULT_POLL_TIMEOUT_MS),
            settle: Duration::from_millis(DEFAULT_SETTLE_MS),
            error_backoff: Duration::from_millis(DEFAULT_ERROR_BACKOFF_MS),
        }
    }
}

impl AccessLoopConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }
}

/// Counters of what the loop has done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessLoopStats {
    pub tags_read: u64,
    pub granted: u64,
    pub denied: u64,
    pub lookup_errors: u64,
    pub read_errors: u64,
}

/// The access decision loop.
pub struct AccessLoop<A, D> {
    reader: SharedReader,
    authorizer: A,
    door: D,
    config: AccessLoopConfig,
    stats: AccessLoopStats,
}

impl<A, D> AccessLoop<A, D>
where
    A: AccessAuthorizer + 'static,
    D: Door + 'static,
{
    pub fn new(reader: SharedReader, authorizer: A, door: D, config: AccessLoopConfig) -> Self {
        Self {
            reader,
            authorizer,
            door,
            config,
            stats: AccessLoopStats::default(),
        }
    }

    /// Start the loop on the runtime.
    pub fn spawn(self, cancel: CancellationToken) -> AccessLoopHandle<D> {
        let task = tokio::spawn(self.run(cancel.clone()));
        AccessLoopHandle { cancel, task }
    }

    /// Run until `cancel` fires, then hand the door back for shutdown.
    pub async fn run(mut self, cancel: CancellationToken) -> LoopExit<D> {
        info!(
            poll_timeout_ms = self.config.poll_timeout.as_millis() as u64,
            settle_ms = self.config.settle.as_millis() as u64,
            door = %self.door.describe(),
            "Starting access loop"
        );

        while !cancel.is_cancelled() {
            let read = tokio::select! {
                _ = cancel.cancelled() => break,
                read = read_next_tag(&mut self.reader, self.config.poll_timeout) => read,
            };

            let tag = match read {
                Ok(tag) => tag,
                Err(e) => {
                    self.stats.read_errors += 1;
                    error!(error = %e, "Error encountered while reading tag");
                    Self::pause(&cancel, self.config.error_backoff).await;
                    continue;
                }
            };

            let Some(tag_id) = tag.tag_id() else {
                continue;
            };
            self.stats.tags_read += 1;

            let allowed = match self.authorizer.is_access_allowed(tag_id).await {
                Ok(allowed) => allowed,
                Err(e) => {
                    self.stats.lookup_errors += 1;
                    warn!(key = %tag_id, error = %e, "Error determining access");
                    Self::pause(&cancel, self.config.error_backoff).await;
                    continue;
                }
            };

            let signal = if allowed {
                self.stats.granted += 1;
                info!(key = %tag_id, "Access granted");
                self.door.auth_ok()
            } else {
                self.stats.denied += 1;
                info!(key = %tag_id, "Access NOT granted");
                self.door.auth_fail()
            };
            if let Err(e) = signal {
                error!(key = %tag_id, error = %e, "Failed to signal door");
            }

            Self::pause(&cancel, self.config.settle).await;
        }

        info!(stats = ?self.stats, "Access loop stopped");
        LoopExit {
            door: self.door,
            stats: self.stats,
        }
    }

    async fn pause(cancel: &CancellationToken, duration: Duration) {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(duration) => {}
        }
    }
}

/// What a finished loop returns.
#[derive(Debug)]
pub struct LoopExit<D> {
    pub door: D,
    pub stats: AccessLoopStats,
}

/// Handle to a spawned [`AccessLoop`].
#[derive(Debug)]
pub struct AccessLoopHandle<D> {
    cancel: CancellationToken,
    task: JoinHandle<LoopExit<D>>,
}

impl<D> AccessLoopHandle<D> {
    /// Stop the loop and wait for it.
    ///
    /// Returns `None` if the loop task panicked.
    pub async fn shutdown(self) -> Option<LoopExit<D>> {
        self.cancel.cancel();
        match self.task.await {
            Ok(exit) => Some(exit),
            Err(e) => {
                error!(error = %e, "Access loop task failed");
                None
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latchkey_core::StaticAuthorizer;
    use latchkey_door::NoopDoor;
    use latchkey_hardware::noop::NoopReader;
    use latchkey_hardware::TagReader;

    const ZERO_TAG: &str = "00000000000000000000000000000000";

    fn config() -> AccessLoopConfig {
        AccessLoopConfig::new()
            .poll_timeout(Duration::from_millis(100))
            .settle(Duration::from_secs(3))
    }

    #[test]
    fn test_config_defaults() {
        let config = AccessLoopConfig::default();
        assert_eq!(config.poll_timeout, Duration::from_secs(3));
        assert_eq!(config.settle, Duration::from_secs(3));
        assert_eq!(config.error_backoff, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_allowed_tag_opens_door_once_per_settle() {
        let mut reader = SharedReader::new(NoopReader::new());
        reader.initialize().await.unwrap();
        let door = NoopDoor::new();
        let observer = door.clone();
        let authorizer = StaticAuthorizer::new().allow(ZERO_TAG);

        let handle = AccessLoop::new(reader, authorizer, door, config()).spawn(CancellationToken::new());

        tokio::time::sleep(Duration::from_millis(4500)).await;
        let exit = handle.shutdown().await.unwrap();

        // Signals at t=0 and t=3s.
        assert_eq!(observer.ok_count(), 2);
        assert_eq!(observer.fail_count(), 0);
        assert_eq!(exit.stats.granted, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_tag_fails() {
        let reader = SharedReader::new(NoopReader::new());
        let door = NoopDoor::new();
        let observer = door.clone();

        let handle = AccessLoop::new(reader, StaticAuthorizer::new(), door, config())
            .spawn(CancellationToken::new());
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.shutdown().await.unwrap();

        assert_eq!(observer.ok_count(), 0);
        assert_eq!(observer.fail_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_error_sends_no_signal() {
        let reader = SharedReader::new(NoopReader::new());
        let door = NoopDoor::new();
        let observer = door.clone();
        let authorizer = StaticAuthorizer::new().fail(ZERO_TAG);

        let handle = AccessLoop::new(reader, authorizer, door, config()).spawn(CancellationToken::new());
        tokio::time::sleep(Duration::from_millis(10)).await;
        let exit = handle.shutdown().await.unwrap();

        assert_eq!(observer.ok_count() + observer.fail_count(), 0);
        assert!(exit.stats.lookup_errors > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_settle() {
        let reader = SharedReader::new(NoopReader::new());
        let cancel = CancellationToken::new();
        let handle = AccessLoop::new(
            reader,
            StaticAuthorizer::new().allow(ZERO_TAG),
            NoopDoor::new(),
            config().settle(Duration::from_secs(3600)),
        )
        .spawn(cancel.clone());

        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(handle.is_finished());

        let exit = handle.shutdown().await.unwrap();
        assert_eq!(exit.door.ok_count(), 1);
    }
}
