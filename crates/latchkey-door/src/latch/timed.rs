//! Latch whose resting level follows a daily time window.
//!
//! The task re-derives the baseline from the clock every time it wakes, so a
//! late timer, a clock step or a missed event converges on the right level
//! at the next wake-up instead of toggling out of phase.

use super::{LatchCommand, LatchHandle, drive};
use crate::clock::Clock;
use crate::handoff::{self, HandoffReceiver};
use crate::time_window::TimeWindow;
use chrono::TimeZone;
use latchkey_hardware::{Level, OutputPin};
use std::time::Duration;
use tracing::{debug, info};

/// Window bounds are exclusive; wake this long after an event.
const WAKE_SLACK: Duration = Duration::from_millis(1);

#[derive(Debug)]
pub struct TimedLatch<P, Tz: TimeZone, C> {
    pin: P,
    window: TimeWindow<Tz>,
    clock: C,
}

impl<P, Tz, C> TimedLatch<P, Tz, C>
where
    P: OutputPin,
    Tz: TimeZone + Send + Sync + 'static,
    Tz::Offset: Send + Sync,
    C: Clock,
{
    pub fn new(pin: P, window: TimeWindow<Tz>, clock: C) -> Self {
        Self { pin, window, clock }
    }

    /// Start the latch task. The output is set to the current baseline
    /// immediately.
    pub fn spawn(self) -> LatchHandle {
        let name = self.pin.name().to_string();
        let (commands, receiver) = handoff::channel();
        let task = tokio::spawn(self.run(receiver));
        LatchHandle::new(name, commands, task)
    }

    async fn run(mut self, mut commands: HandoffReceiver<LatchCommand>) {
        info!(
            pin = %self.pin.name(),
            open_from = %self.window.open_from(),
            open_till = %self.window.open_till(),
            "Starting timed latch"
        );

        loop {
            let now = self.clock.now();
            let level = self.window.baseline_level(now);
            drive(&mut self.pin, level);

            let next = self.window.next_event(now);
            let wait = (next - now).to_std().unwrap_or_default() + WAKE_SLACK;
            debug!(pin = %self.pin.name(), %level, next = %next, "Armed window timer");

            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    info!(
                        pin = %self.pin.name(),
                        duration_ms = command.unlock_duration.as_millis() as u64,
                        "Holding latch open"
                    );
                    drive(&mut self.pin, Level::Low);
                    tokio::time::sleep(command.unlock_duration).await;
                }
                _ = tokio::time::sleep(wait) => {
                    debug!(pin = %self.pin.name(), "Window timer fired");
                }
            }
        }

        // Leave the door locked once nothing can drive it any more.
        drive(&mut self.pin, Level::High);
        debug!(pin = %self.pin.name(), "Timed latch stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VirtualClock;
    use crate::handoff::Handoff;
    use crate::latch::Latch;
    use chrono::{NaiveTime, TimeDelta, Utc};
    use latchkey_hardware::mock::MockPin;

    fn window() -> TimeWindow<Utc> {
        TimeWindow::new(
            NaiveTime::from_hms_opt(5, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            Utc,
        )
        .unwrap()
    }

    fn clock_at(h: u32, m: u32) -> VirtualClock {
        VirtualClock::starting_at(Utc.with_ymd_and_hms(2024, 3, 15, h, m, 0).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_at_baseline() {
        let (pin, handle) = MockPin::new("bolt");
        let latch = TimedLatch::new(pin, window(), clock_at(12, 0)).spawn();
        tokio::task::yield_now().await;

        assert_eq!(handle.level(), Some(Level::Low));
        latch.shutdown().await;
        assert_eq!(handle.level(), Some(Level::High));
    }

    #[tokio::test(start_paused = true)]
    async fn test_follows_window_across_events() {
        let (pin, handle) = MockPin::new("bolt");
        let latch = TimedLatch::new(pin, window(), clock_at(4, 0)).spawn();
        tokio::task::yield_now().await;
        assert_eq!(handle.level(), Some(Level::High));

        tokio::time::sleep(Duration::from_secs(3600 + 1)).await;
        assert_eq!(handle.level(), Some(Level::Low));

        tokio::time::sleep(Duration::from_secs(18 * 3600)).await;
        assert_eq!(handle.level(), Some(Level::High));

        latch.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlock_restores_baseline() {
        let (pin, handle) = MockPin::new("bolt");
        let latch = TimedLatch::new(pin, window(), clock_at(2, 0)).spawn();
        tokio::task::yield_now().await;

        assert_eq!(latch.unlock(Duration::from_secs(3)).unwrap(), Handoff::Accepted);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(handle.level(), Some(Level::Low));
        assert_eq!(latch.unlock(Duration::from_secs(3)).unwrap(), Handoff::Dropped);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(handle.level(), Some(Level::High));
        assert_eq!(handle.low_count(), 1);

        latch.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlock_spanning_window_open_ends_low() {
        let (pin, handle) = MockPin::new("bolt");
        let latch = TimedLatch::new(pin, window(), clock_at(4, 59)).spawn();
        tokio::task::yield_now().await;

        latch.unlock(Duration::from_secs(120)).unwrap();
        tokio::time::sleep(Duration::from_secs(121)).await;

        assert_eq!(handle.level(), Some(Level::Low));
        latch.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_step_corrected_at_next_wakeup() {
        let (pin, handle) = MockPin::new("bolt");
        let clock = clock_at(4, 0);
        let latch = TimedLatch::new(pin, window(), clock.clone()).spawn();
        tokio::task::yield_now().await;

        // Wall clock jumps past 23:00 while the timer for 05:00 is armed.
        clock.jump(TimeDelta::hours(20));
        tokio::time::sleep(Duration::from_secs(3600 + 1)).await;

        assert_eq!(handle.level(), Some(Level::High));
        assert!(!handle.levels().contains(&Level::Low));
        latch.shutdown().await;
    }
}
