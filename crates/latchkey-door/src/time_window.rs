//! Daily time-of-day window.
//!
//! A window `open_from..open_till` repeats every calendar day in its own
//! timezone. Inside the window (bounds excluded) a timed latch rests low
//! (unlocked); outside it rests high (locked). Both operations are pure
//! functions of the instant they are given.
//!
//! Days are advanced by calendar date, never by adding 24 hours, so a day
//! with a DST transition still yields the configured local times. A local
//! time that does not exist (skipped by a spring-forward gap) resolves to
//! the first valid instant after the gap.

use crate::error::{LatchError, Result};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use latchkey_hardware::Level;
use std::fmt;

#[derive(Clone)]
pub struct TimeWindow<Tz: TimeZone> {
    open_from: NaiveTime,
    open_till: NaiveTime,
    tz: Tz,
}

impl<Tz: TimeZone> fmt::Debug for TimeWindow<Tz> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeWindow")
            .field("open_from", &self.open_from)
            .field("open_till", &self.open_till)
            .finish_non_exhaustive()
    }
}

impl<Tz: TimeZone> TimeWindow<Tz> {
    /// Create a window.
    ///
    /// # Errors
    ///
    /// [`LatchError::InvalidWindow`] unless `open_from < open_till`. Windows
    /// spanning midnight are not supported.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{FixedOffset, NaiveTime, TimeZone};
    /// use latchkey_door::time_window::TimeWindow;
    /// use latchkey_hardware::Level;
    ///
    /// let tz = FixedOffset::east_opt(3600).unwrap();
    /// let window = TimeWindow::new(
    ///     NaiveTime::from_hms_opt(5, 0, 0).unwrap(),
    ///     NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
    ///     tz,
    /// )
    /// .unwrap();
    ///
    /// let now = tz.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap().to_utc();
    /// assert_eq!(window.baseline_level(now), Level::Low);
    /// ```
    pub fn new(open_from: NaiveTime, open_till: NaiveTime, tz: Tz) -> Result<Self> {
        if open_from >= open_till {
            return Err(LatchError::invalid_window(open_from, open_till));
        }
        Ok(Self {
            open_from,
            open_till,
            tz,
        })
    }

    pub fn open_from(&self) -> NaiveTime {
        self.open_from
    }

    pub fn open_till(&self) -> NaiveTime {
        self.open_till
    }

    /// Resting level at `now`: low strictly inside the window, high elsewhere.
    pub fn baseline_level(&self, now: DateTime<Utc>) -> Level {
        let day = now.with_timezone(&self.tz).date_naive();
        let from = self.resolve(day, self.open_from);
        let till = self.resolve(day, self.open_till);

        if from < now && now < till {
            Level::Low
        } else {
            Level::High
        }
    }

    /// Earliest occurrence of `open_from` or `open_till` strictly after `now`.
    pub fn next_event(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.with_timezone(&self.tz).date_naive();

        // Two days ahead always contains the next `open_from`.
        for offset in 0..=2 {
            let Some(day) = today.checked_add_days(Days::new(offset)) else {
                break;
            };
            for time in [self.open_from, self.open_till] {
                let event = self.resolve(day, time);
                if event > now {
                    return event;
                }
            }
        }

        now + TimeDelta::days(1)
    }

    /// The instant `time` occurs on `day` in the window's timezone.
    fn resolve(&self, day: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        let local = day.and_time(time);
        if let Some(instant) = self.tz.from_local_datetime(&local).earliest() {
            return instant.to_utc();
        }

        // Inside a DST gap: step forward until the local time exists again.
        let mut candidate = local;
        for _ in 0..(4 * 60) {
            candidate += TimeDelta::minutes(1);
            if let Some(instant) = self.tz.from_local_datetime(&candidate).earliest() {
                return instant.to_utc();
            }
        }
        self.tz.from_utc_datetime(&local).to_utc()
    }
}
