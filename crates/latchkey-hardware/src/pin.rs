//! Linux sysfs GPIO output pin.
//!
//! ```text
//! /sys/class/gpio/export          <- "17"
//! /sys/class/gpio/gpio17/direction <- "out"
//! /sys/class/gpio/gpio17/value     <- "0" | "1"
//! ```

use crate::error::{HardwareError, Result};
use crate::traits::OutputPin;
use crate::types::Level;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default sysfs GPIO root.
pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

/// Output pin driven through the sysfs GPIO interface.
#[derive(Debug)]
pub struct SysfsPin {
    name: String,
    value_path: PathBuf,
}

impl SysfsPin {
    /// Export `number` under the default root and configure it as an output.
    pub fn open(number: u32) -> Result<Self> {
        Self::with_root(SYSFS_GPIO_ROOT, number)
    }

    /// Same as [`open`](Self::open) with a custom sysfs root.
    pub fn with_root(root: impl AsRef<Path>, number: u32) -> Result<Self> {
        let root = root.as_ref();
        let name = format!("gpio{number}");
        let pin_dir = root.join(&name);

        if !pin_dir.exists() {
            debug!(pin = %name, "Exporting GPIO pin");
            fs::write(root.join("export"), number.to_string())
                .map_err(|e| HardwareError::pin(&name, format!("export failed: {e}")))?;
        }

        fs::write(pin_dir.join("direction"), "out")
            .map_err(|e| HardwareError::pin(&name, format!("set direction failed: {e}")))?;

        info!(pin = %name, "Configured GPIO output");
        Ok(Self {
            value_path: pin_dir.join("value"),
            name,
        })
    }
}

impl OutputPin for SysfsPin {
    fn set_level(&mut self, level: Level) -> Result<()> {
        fs::write(&self.value_path, level.as_sysfs())
            .map_err(|e| HardwareError::pin(&self.name, format!("write {level} failed: {e}")))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
