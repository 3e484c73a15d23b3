//! Error types for the access decision path.

use latchkey_hardware::HardwareError;

/// Result type alias for access operations.
pub type Result<T> = std::result::Result<T, AccessError>;

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// The reader failed in a way the read protocol cannot recover from.
    #[error("Reader error: {0}")]
    Hardware(#[from] HardwareError),

    /// The authorization lookup failed.
    #[error(transparent)]
    Lookup(#[from] latchkey_core::Error),
}
