//! Wall-clock source for time-of-day decisions.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall clock that advances with Tokio's clock.
///
/// Starts at a fixed time and moves forward as [`tokio::time::Instant`]
/// does, so under a paused runtime it follows `tokio::time::advance` and
/// auto-advance exactly. [`jump`](Self::jump) shifts it without moving Tokio
/// time, like an NTP step or a missed wake-up.
#[derive(Debug, Clone)]
pub struct VirtualClock {
    start: DateTime<Utc>,
    anchor: Instant,
    offset: Arc<Mutex<TimeDelta>>,
}

impl VirtualClock {
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            start,
            anchor: Instant::now(),
            offset: Arc::new(Mutex::new(TimeDelta::zero())),
        }
    }

    /// Shift the wall clock by `delta`.
    pub fn jump(&self, delta: TimeDelta) {
        let mut offset = self
            .offset
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *offset += delta;
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(self.anchor.elapsed()).unwrap_or_default();
        let offset = *self
            .offset
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.start + elapsed + offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_virtual_clock_follows_tokio_time() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 4, 0, 0).unwrap();
        let clock = VirtualClock::starting_at(start);
        assert_eq!(clock.now(), start);

        tokio::time::advance(Duration::from_secs(90)).await;
        assert_eq!(clock.now(), start + TimeDelta::seconds(90));

        clock.jump(TimeDelta::hours(2));
        assert_eq!(clock.now(), start + TimeDelta::seconds(90) + TimeDelta::hours(2));
    }
}
