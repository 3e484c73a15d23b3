//! JSON configuration file.
//!
//! Every key is optional; a missing file section falls back to the values a
//! development machine without hardware needs (no-op reader, no-op door).
//!
//! ```json
//! {
//!   "sqlite_file": "/var/lib/latchkey/keys.db",
//!   "listen_http": ":8080",
//!   "reader": { "kind": "noop" },
//!   "door": {
//!     "kind": "gpio",
//!     "main_pin": 22, "bolt_pin": 27, "fail_pin": 23,
//!     "open_from": "05:00", "open_till": "23:00",
//!     "utc_offset_minutes": 60
//!   },
//!   "access": { "poll_timeout_ms": 3000, "settle_ms": 3000 }
//! }
//! ```

use chrono::NaiveTime;
use latchkey_access::AccessLoopConfig;
use latchkey_core::constants::{
    DEFAULT_ANTENNA_GAIN, DEFAULT_ERROR_BACKOFF_MS, DEFAULT_POLL_TIMEOUT_MS, DEFAULT_SETTLE_MS,
    DEFAULT_UNLOCK_MS,
};
use latchkey_core::{Error, Result};
use latchkey_door::DoorConfig;
use latchkey_hardware::pin::SYSFS_GPIO_ROOT;
use latchkey_hardware::reader::ReaderConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Key database. Without it only `allowed_keys` open the door.
    pub sqlite_file: Option<String>,

    /// Address of the management API served by the embedding controller.
    pub listen_http: Option<String>,

    /// Keys allowed when no database is configured.
    pub allowed_keys: Vec<String>,

    pub reader: ReaderSettings,
    pub door: DoorSettings,
    pub access: AccessSettings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReaderKind {
    #[default]
    Noop,
    Hardware,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderSettings {
    pub kind: ReaderKind,
    pub antenna_gain: u8,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            kind: ReaderKind::Noop,
            antenna_gain: DEFAULT_ANTENNA_GAIN,
        }
    }
}

impl ReaderSettings {
    /// Session settings for a hardware reader.
    pub fn reader_config(&self) -> ReaderConfig {
        ReaderConfig::default().antenna_gain(self.antenna_gain)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoorKind {
    #[default]
    Noop,
    Gpio,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoorSettings {
    pub kind: DoorKind,
    pub unlock_duration_ms: u64,

    /// Door strike, pulsed on every authorized tag.
    pub main_pin: Option<u32>,

    /// Bolt left open during the daily window, pulsed outside it.
    pub bolt_pin: Option<u32>,

    /// Indicator pulsed on rejected tags.
    pub fail_pin: Option<u32>,

    pub open_from: String,
    pub open_till: String,

    /// Fixed offset of the window's timezone; the system timezone if absent.
    pub utc_offset_minutes: Option<i32>,

    pub gpio_root: String,
}

impl Default for DoorSettings {
    fn default() -> Self {
        Self {
            kind: DoorKind::Noop,
            unlock_duration_ms: DEFAULT_UNLOCK_MS,
            main_pin: None,
            bolt_pin: None,
            fail_pin: None,
            open_from: "05:00".to_string(),
            open_till: "23:00".to_string(),
            utc_offset_minutes: None,
            gpio_root: SYSFS_GPIO_ROOT.to_string(),
        }
    }
}

impl DoorSettings {
    pub fn door_config(&self) -> DoorConfig {
        DoorConfig::new().unlock_duration(Duration::from_millis(self.unlock_duration_ms))
    }

    /// Parsed `(open_from, open_till)`.
    pub fn window_times(&self) -> Result<(NaiveTime, NaiveTime)> {
        Ok((
            parse_time_of_day("door.open_from", &self.open_from)?,
            parse_time_of_day("door.open_till", &self.open_till)?,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessSettings {
    pub poll_timeout_ms: u64,
    pub settle_ms: u64,
    pub error_backoff_ms: u64,
}

impl Default for AccessSettings {
    fn default() -> Self {
        Self {
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT_MS,
            settle_ms: DEFAULT_SETTLE_MS,
            error_backoff_ms: DEFAULT_ERROR_BACKOFF_MS,
        }
    }
}

impl AccessSettings {
    pub fn loop_config(&self) -> AccessLoopConfig {
        AccessLoopConfig::new()
            .poll_timeout(Duration::from_millis(self.poll_timeout_ms))
            .settle(Duration::from_millis(self.settle_ms))
            .error_backoff(Duration::from_millis(self.error_backoff_ms))
    }
}

impl Config {
    /// Read and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Reading config");

        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| Error::Config(format!("invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.reader.antenna_gain > 7 {
            return Err(Error::Config(format!(
                "reader.antenna_gain must be 0-7, got {}",
                self.reader.antenna_gain
            )));
        }

        if self.door.kind == DoorKind::Gpio {
            if self.door.main_pin.is_none() {
                return Err(Error::MissingConfig("door.main_pin".to_string()));
            }
            if self.door.bolt_pin.is_some() {
                self.door.window_times()?;
            }
        }

        if let Some(minutes) = self.door.utc_offset_minutes
            && !(-24 * 60 < minutes && minutes < 24 * 60)
        {
            return Err(Error::Config(format!(
                "door.utc_offset_minutes out of range: {minutes}"
            )));
        }

        Ok(())
    }
}

fn parse_time_of_day(key: &str, value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|e| Error::Config(format!("{key}: invalid time of day {value:?}: {e}")))
}
