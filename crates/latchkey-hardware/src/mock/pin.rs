//! Recording output pin.

use crate::error::{HardwareError, Result};
use crate::traits::OutputPin;
use crate::types::Level;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::Instant;

/// One write observed on a [`MockPin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinEvent {
    pub level: Level,
    pub at: Instant,
}

#[derive(Debug, Default)]
struct PinState {
    history: Vec<PinEvent>,
    fail_writes: bool,
}

fn lock(state: &Mutex<PinState>) -> MutexGuard<'_, PinState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Output pin that records every level written to it.
///
/// Timestamps come from [`tokio::time::Instant`], so tests running with a
/// paused clock can assert exact pulse lengths.
#[derive(Debug)]
pub struct MockPin {
    name: String,
    state: Arc<Mutex<PinState>>,
}

impl MockPin {
    pub fn new(name: impl Into<String>) -> (Self, MockPinHandle) {
        let state = Arc::new(Mutex::new(PinState::default()));
        (
            Self {
                name: name.into(),
                state: Arc::clone(&state),
            },
            MockPinHandle { state },
        )
    }
}

impl OutputPin for MockPin {
    fn set_level(&mut self, level: Level) -> Result<()> {
        let mut state = lock(&self.state);
        if state.fail_writes {
            return Err(HardwareError::pin(&self.name, "write rejected"));
        }
        state.history.push(PinEvent {
            level,
            at: Instant::now(),
        });
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Handle for inspecting a [`MockPin`].
#[derive(Debug, Clone)]
pub struct MockPinHandle {
    state: Arc<Mutex<PinState>>,
}

impl MockPinHandle {
    /// Current level, `None` if never written.
    pub fn level(&self) -> Option<Level> {
        lock(&self.state).history.last().map(|e| e.level)
    }

    /// Every write in order.
    pub fn history(&self) -> Vec<PinEvent> {
        lock(&self.state).history.clone()
    }

    /// Levels written, without timestamps.
    pub fn levels(&self) -> Vec<Level> {
        lock(&self.state).history.iter().map(|e| e.level).collect()
    }

    /// Number of transitions to [`Level::Low`].
    pub fn low_count(&self) -> usize {
        lock(&self.state)
            .history
            .iter()
            .filter(|e| e.level == Level::Low)
            .count()
    }

    /// Make subsequent writes fail.
    pub fn fail_writes(&self, fail: bool) {
        lock(&self.state).fail_writes = fail;
    }

    pub fn clear(&self) {
        lock(&self.state).history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_levels() {
        let (mut pin, handle) = MockPin::new("main");
        assert_eq!(handle.level(), None);

        pin.set_level(Level::High).unwrap();
        pin.set_level(Level::Low).unwrap();

        assert_eq!(handle.levels(), vec![Level::High, Level::Low]);
        assert_eq!(handle.level(), Some(Level::Low));
        assert_eq!(handle.low_count(), 1);
        assert_eq!(pin.name(), "main");
    }

    #[tokio::test]
    async fn test_failed_write_not_recorded() {
        let (mut pin, handle) = MockPin::new("bolt");
        handle.fail_writes(true);

        let err = pin.set_level(Level::Low).unwrap_err();
        assert!(matches!(err, HardwareError::Pin { .. }));
        assert!(handle.history().is_empty());
    }
}
