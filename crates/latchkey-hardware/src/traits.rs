//! Hardware device trait definitions.
//!
//! Three seams separate the door controller from the physical world:
//!
//! - [`TagReader`] is what the rest of the system talks to. It owns the
//!   session lifecycle (initialize, halt) and exposes reads with a timeout.
//! - [`ReaderLink`] and [`LinkOpener`] are what a reader driver provides: an
//!   open session to the chip and a way to open a fresh one. The contactless
//!   protocol framing lives entirely below this seam.
//! - [`OutputPin`] is a single digital output driving a latch.
//!
//! `TagReader` uses native `async fn` methods (Rust 1.90 + Edition 2024
//! RPITIT). The driver-side traits are synchronous because the chip drivers
//! block on the bus; [`HardwareReader`](crate::reader::HardwareReader) moves
//! those calls onto the blocking pool.

#![allow(async_fn_in_trait)]

use crate::error::Result;
use crate::types::{AuthBlock, Level, SectorKey};
use latchkey_core::constants::NUM_BYTES_PER_BLOCK;
use std::time::Duration;

/// Contactless tag reader abstraction.
///
/// # Object Safety and Dynamic Dispatch
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. For dynamic dispatch use the enum wrapper
/// [`AnyTagReader`](crate::devices::AnyTagReader), the same pattern used for
/// every device family in this crate.
///
/// # Error contract
///
/// | Error | Meaning | Caller action |
/// |---|---|---|
/// | [`Irq`](crate::HardwareError::Irq) | link state corrupted | reinitialize, retry |
/// | [`Timeout`](crate::HardwareError::Timeout) | no tag presented | report "no tag" |
/// | `Ok(vec![])` from `read_uid` | empty result | retry |
/// | anything else | unclassified | fail this attempt |
///
/// # Examples
///
/// ```no_run
/// use latchkey_hardware::traits::TagReader;
/// use latchkey_hardware::error::Result;
/// use std::time::Duration;
///
/// async fn wait_for_tag<R: TagReader>(reader: &mut R) -> Result<Vec<u8>> {
///     reader.initialize().await?;
///     reader.read_uid(Duration::from_secs(5)).await
/// }
/// ```
pub trait TagReader: Send + Sync {
    /// Tear down any existing session and open a new one.
    ///
    /// Idempotent: calling it on a live reader replaces the session.
    ///
    /// # Errors
    ///
    /// Returns [`Link`](crate::HardwareError::Link) if the link cannot be
    /// opened or configured.
    async fn initialize(&mut self) -> Result<()>;

    /// Release the physical link.
    ///
    /// Safe to call any number of times.
    async fn halt(&mut self) -> Result<()>;

    /// Block until a tag identifier is read or `timeout` elapses.
    async fn read_uid(&mut self, timeout: Duration) -> Result<Vec<u8>>;

    /// Read the three data blocks of a sector (48 bytes).
    ///
    /// A failure on any block aborts the whole sector; no partial data is
    /// returned.
    async fn read_data_blocks(&mut self, timeout: Duration, sector: usize) -> Result<Vec<u8>>;

    /// Read a single data block of a sector.
    async fn read_data_block(
        &mut self,
        timeout: Duration,
        sector: usize,
        block: usize,
    ) -> Result<[u8; NUM_BYTES_PER_BLOCK]>;

    /// Read the keys and permission bits of a sector (the "sector trailer").
    async fn read_auth_block(&mut self, timeout: Duration, sector: usize) -> Result<AuthBlock>;

    /// Human-readable description used in logs.
    fn describe(&self) -> String;
}

/// An open session to a reader chip.
///
/// Implemented by reader drivers. All methods block for at most the given
/// timeout.
pub trait ReaderLink: Send {
    /// Configure the receiver gain (0-7).
    fn set_antenna_gain(&mut self, gain: u8) -> Result<()>;

    /// Read the identifier of the tag in the field.
    fn read_uid(&mut self, timeout: Duration) -> Result<Vec<u8>>;

    /// Authenticate with `key` and read one block of a sector.
    fn read_block(
        &mut self,
        timeout: Duration,
        sector: usize,
        block: usize,
        key: &SectorKey,
    ) -> Result<[u8; NUM_BYTES_PER_BLOCK]>;

    /// Authenticate with `key` and read the raw trailer of a sector.
    fn read_trailer(
        &mut self,
        timeout: Duration,
        sector: usize,
        key: &SectorKey,
    ) -> Result<[u8; NUM_BYTES_PER_BLOCK]>;

    /// Put the chip to sleep.
    fn halt(&mut self) -> Result<()>;

    /// Close the underlying port.
    fn close(&mut self) -> Result<()>;

    /// Device identity, e.g. the port name and chip version.
    fn describe(&self) -> String;
}

/// Opens new [`ReaderLink`] sessions.
pub trait LinkOpener: Send + Sync {
    /// Open the port and construct a new device handle on it.
    fn open(&self) -> Result<Box<dyn ReaderLink>>;
}

impl<T: LinkOpener + ?Sized> LinkOpener for Box<T> {
    fn open(&self) -> Result<Box<dyn ReaderLink>> {
        (**self).open()
    }
}

/// A single digital output.
///
/// Writes are immediate; pins are owned by exactly one latch task.
pub trait OutputPin: Send + 'static {
    /// Drive the output to `level`.
    fn set_level(&mut self, level: Level) -> Result<()>;

    /// Pin name for logs.
    fn name(&self) -> &str;
}
