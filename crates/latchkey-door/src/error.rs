//! Error types for latch and door operations.

use chrono::NaiveTime;
use latchkey_hardware::HardwareError;

/// Result type alias for latch operations.
pub type Result<T> = std::result::Result<T, LatchError>;

#[derive(Debug, thiserror::Error)]
pub enum LatchError {
    /// The window does not open before it closes.
    #[error("Invalid time window: open_from {open_from} must be before open_till {open_till}")]
    InvalidWindow {
        open_from: NaiveTime,
        open_till: NaiveTime,
    },

    /// The latch or dispatch task has stopped and no longer accepts commands.
    #[error("Latch task has stopped")]
    Closed,

    /// Output pin failure.
    #[error("Pin error: {0}")]
    Pin(#[from] HardwareError),
}

impl LatchError {
    pub fn invalid_window(open_from: NaiveTime, open_till: NaiveTime) -> Self {
        Self::InvalidWindow {
            open_from,
            open_till,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_window_display() {
        let err = LatchError::invalid_window(
            NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(5, 0, 0).unwrap(),
        );
        assert_eq!(
            err.to_string(),
            "Invalid time window: open_from 23:00:00 must be before open_till 05:00:00"
        );
    }

    #[test]
    fn test_pin_error_conversion() {
        let err: LatchError = HardwareError::pin("gpio22", "permission denied").into();
        assert!(matches!(err, LatchError::Pin(_)));
        assert_eq!(err.to_string(), "Pin error: Pin gpio22 error: permission denied");
    }
}
