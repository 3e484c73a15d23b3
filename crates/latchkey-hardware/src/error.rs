//! Error types for reader and output pin operations.
//!
//! The reader errors mirror how callers must react to them: an IRQ fault
//! means the link state is corrupted and the session must be reopened, a
//! timeout means nobody presented a tag, and a link error means the session
//! could not be opened at all.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during hardware device operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The physical link could not be opened or configured.
    #[error("Link error: {message}")]
    Link { message: String },

    /// The link's interrupt state is corrupted; the session must be reopened.
    #[error("IRQ error")]
    Irq,

    /// No tag answered within the timeout.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// A block of a sector could not be read.
    #[error("Failed to read sector={sector} block={block}: {source}")]
    SectorRead {
        sector: usize,
        block: usize,
        #[source]
        source: Box<HardwareError>,
    },

    /// Sector or block index outside the tag geometry.
    #[error("Invalid address: {message}")]
    InvalidAddress { message: String },

    /// A read was attempted before the reader was initialized.
    #[error("Reader not initialized")]
    NotInitialized,

    /// Output pin could not be driven.
    #[error("Pin {pin} error: {message}")]
    Pin { pin: String, message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl HardwareError {
    /// Create a new link error.
    pub fn link(message: impl Into<String>) -> Self {
        Self::Link {
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Wrap a block failure with its sector/block address.
    pub fn sector_read(sector: usize, block: usize, source: HardwareError) -> Self {
        Self::SectorRead {
            sector,
            block,
            source: Box::new(source),
        }
    }

    /// Create a new invalid address error.
    pub fn invalid_address(message: impl Into<String>) -> Self {
        Self::InvalidAddress {
            message: message.into(),
        }
    }

    /// Create a new pin error.
    pub fn pin(pin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pin {
            pin: pin.into(),
            message: message.into(),
        }
    }

    /// Create a generic error with custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Whether the link needs to be reinitialized before the next read.
    ///
    /// Looks through sector read wrappers.
    pub fn is_irq(&self) -> bool {
        match self {
            Self::Irq => true,
            Self::SectorRead { source, .. } => source.is_irq(),
            _ => false,
        }
    }

    /// Whether the reader has no usable session: the link state is corrupted
    /// or an earlier reopen failed. Either way `initialize` must run before
    /// the next read can succeed.
    pub fn needs_reinitialize(&self) -> bool {
        match self {
            Self::Irq | Self::NotInitialized => true,
            Self::SectorRead { source, .. } => source.needs_reinitialize(),
            _ => false,
        }
    }

    /// Whether the operation gave up because no tag was presented.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::SectorRead { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_error() {
        let error = HardwareError::link("spidev0.0 busy");
        assert!(matches!(error, HardwareError::Link { .. }));
        assert_eq!(error.to_string(), "Link error: spidev0.0 busy");
    }

    #[test]
    fn test_timeout_error() {
        let error = HardwareError::timeout(3000);
        assert!(error.is_timeout());
        assert!(!error.is_irq());
        assert_eq!(error.to_string(), "Operation timeout after 3000ms");
    }

    #[test]
    fn test_sector_read_error_keeps_cause() {
        let error = HardwareError::sector_read(3, 1, HardwareError::Irq);
        assert!(error.is_irq());
        assert!(!error.is_timeout());
        assert_eq!(error.to_string(), "Failed to read sector=3 block=1: IRQ error");
    }

    #[test]
    fn test_sector_read_timeout_classification() {
        let error = HardwareError::sector_read(0, 2, HardwareError::timeout(5000));
        assert!(error.is_timeout());
    }

    #[test]
    fn test_needs_reinitialize() {
        assert!(HardwareError::Irq.needs_reinitialize());
        assert!(HardwareError::NotInitialized.needs_reinitialize());
        assert!(HardwareError::sector_read(1, 0, HardwareError::NotInitialized).needs_reinitialize());
        assert!(!HardwareError::timeout(100).needs_reinitialize());
        assert!(!HardwareError::link("spidev0.0 busy").needs_reinitialize());
    }

    #[test]
    fn test_pin_error() {
        let error = HardwareError::pin("P1_15", "permission denied");
        assert_eq!(error.to_string(), "Pin P1_15 error: permission denied");
    }
}
