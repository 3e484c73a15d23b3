//! Non-blocking, drop-on-busy handoff between a caller and a worker task.
//!
//! A handoff succeeds only while the receiving task is idle, waiting for its
//! next value. If the task is busy (holding a latch open, say), the value is
//! dropped rather than queued. At most one value is ever in flight.
//!
//! ```text
//!  sender                       receiver task
//!    │  try_handoff(v)              │ recv().await   ready = true
//!    ├─ CAS ready true -> false ───►│
//!    ├─ try_send(v) ───────────────►│ handles v      ready = false
//!    │  try_handoff(w) -> Dropped   │ ...
//! ```

use crate::error::{LatchError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// Outcome of a handoff attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handoff {
    /// The receiver was idle and took the value.
    Accepted,
    /// The receiver was busy; the value was discarded.
    Dropped,
}

impl Handoff {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Create a connected sender/receiver pair.
///
/// The receiver starts out idle, so a value handed off before the worker
/// task first polls `recv` is kept for it.
pub fn channel<T>() -> (HandoffSender<T>, HandoffReceiver<T>) {
    let (tx, rx) = mpsc::channel(1);
    let ready = Arc::new(AtomicBool::new(true));
    (
        HandoffSender {
            tx,
            ready: Arc::clone(&ready),
        },
        HandoffReceiver { rx, ready },
    )
}

#[derive(Debug)]
pub struct HandoffSender<T> {
    tx: mpsc::Sender<T>,
    ready: Arc<AtomicBool>,
}

impl<T> Clone for HandoffSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            ready: Arc::clone(&self.ready),
        }
    }
}

impl<T> HandoffSender<T> {
    /// Hand `value` to the receiver if it is idle.
    ///
    /// # Errors
    ///
    /// Returns [`LatchError::Closed`] if the receiver has been dropped.
    pub fn try_handoff(&self, value: T) -> Result<Handoff> {
        if self.tx.is_closed() {
            return Err(LatchError::Closed);
        }

        if self
            .ready
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(Handoff::Dropped);
        }

        match self.tx.try_send(value) {
            Ok(()) => Ok(Handoff::Accepted),
            Err(mpsc::error::TrySendError::Full(_)) => Ok(Handoff::Dropped),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(LatchError::Closed),
        }
    }
}

#[derive(Debug)]
pub struct HandoffReceiver<T> {
    rx: mpsc::Receiver<T>,
    ready: Arc<AtomicBool>,
}

/// Marks the receiver busy when the pending `recv` completes or is dropped.
struct Busy<'a>(&'a AtomicBool);

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<T> HandoffReceiver<T> {
    /// Wait for the next value. Returns `None` once every sender is gone.
    ///
    /// The receiver counts as idle only while this future is pending.
    /// Cancel safe: a value accepted while the future is being dropped is
    /// returned by the next call.
    pub async fn recv(&mut self) -> Option<T> {
        if let Ok(value) = self.rx.try_recv() {
            return Some(value);
        }

        self.ready.store(true, Ordering::Release);
        let _busy = Busy(&self.ready);
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_initial_handoff_kept_for_worker() {
        let (tx, mut rx) = channel();

        assert_eq!(tx.try_handoff(1).unwrap(), Handoff::Accepted);
        assert_eq!(tx.try_handoff(2).unwrap(), Handoff::Dropped);
        assert_eq!(rx.recv().await, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_while_busy() {
        let (tx, mut rx) = channel::<u32>();
        let (done_tx, mut done_rx) = tokio::sync::mpsc::unbounded_channel();

        let worker = tokio::spawn(async move {
            while let Some(v) = rx.recv().await {
                tokio::time::sleep(Duration::from_secs(3)).await;
                done_tx.send(v).unwrap();
            }
        });
        tokio::task::yield_now().await;

        assert_eq!(tx.try_handoff(1).unwrap(), Handoff::Accepted);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(tx.try_handoff(2).unwrap(), Handoff::Dropped);

        assert_eq!(done_rx.recv().await, Some(1));
        tokio::task::yield_now().await;
        assert_eq!(tx.try_handoff(3).unwrap(), Handoff::Accepted);
        assert_eq!(done_rx.recv().await, Some(3));

        drop(tx);
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_receiver() {
        let (tx, rx) = channel::<()>();
        drop(rx);

        assert!(matches!(tx.try_handoff(()), Err(LatchError::Closed)));
    }

    #[tokio::test]
    async fn test_recv_none_after_senders_dropped() {
        let (tx, mut rx) = channel::<()>();
        drop(tx);

        assert_eq!(rx.recv().await, None);
    }
}
