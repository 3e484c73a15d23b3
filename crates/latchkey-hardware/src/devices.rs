//! Enum wrappers for reader dispatch.
//!
//! Native `async fn` in traits is not object-safe, so `Box<dyn TagReader>`
//! is not an option. [`AnyTagReader`] provides concrete type dispatch over the
//! readers this crate ships instead.
//!
//! # Examples
//!
//! ```
//! use latchkey_hardware::devices::AnyTagReader;
//! use latchkey_hardware::noop::NoopReader;
//!
//! let reader = AnyTagReader::Noop(NoopReader::new());
//! // Can now be used polymorphically through the TagReader trait
//! ```

use crate::error::Result;
use crate::noop::NoopReader;
use crate::reader::HardwareReader;
use crate::traits::TagReader;
use crate::types::AuthBlock;
use latchkey_core::constants::NUM_BYTES_PER_BLOCK;
use std::time::Duration;

/// Enum wrapper for tag reader dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyTagReader {
    /// Reader backed by a chip driver.
    Hardware(HardwareReader),

    /// Reader that always reports an all-zero tag.
    Noop(NoopReader),
}

impl From<HardwareReader> for AnyTagReader {
    fn from(reader: HardwareReader) -> Self {
        Self::Hardware(reader)
    }
}

impl From<NoopReader> for AnyTagReader {
    fn from(reader: NoopReader) -> Self {
        Self::Noop(reader)
    }
}

impl TagReader for AnyTagReader {
    async fn initialize(&mut self) -> Result<()> {
        match self {
            Self::Hardware(reader) => reader.initialize().await,
            Self::Noop(reader) => reader.initialize().await,
        }
    }

    async fn halt(&mut self) -> Result<()> {
        match self {
            Self::Hardware(reader) => reader.halt().await,
            Self::Noop(reader) => reader.halt().await,
        }
    }

    async fn read_uid(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        match self {
            Self::Hardware(reader) => reader.read_uid(timeout).await,
            Self::Noop(reader) => reader.read_uid(timeout).await,
        }
    }

    async fn read_data_blocks(&mut self, timeout: Duration, sector: usize) -> Result<Vec<u8>> {
        match self {
            Self::Hardware(reader) => reader.read_data_blocks(timeout, sector).await,
            Self::Noop(reader) => reader.read_data_blocks(timeout, sector).await,
        }
    }

    async fn read_data_block(
        &mut self,
        timeout: Duration,
        sector: usize,
        block: usize,
    ) -> Result<[u8; NUM_BYTES_PER_BLOCK]> {
        match self {
            Self::Hardware(reader) => reader.read_data_block(timeout, sector, block).await,
            Self::Noop(reader) => reader.read_data_block(timeout, sector, block).await,
        }
    }

    async fn read_auth_block(&mut self, timeout: Duration, sector: usize) -> Result<AuthBlock> {
        match self {
            Self::Hardware(reader) => reader.read_auth_block(timeout, sector).await,
            Self::Noop(reader) => reader.read_auth_block(timeout, sector).await,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Hardware(reader) => reader.describe(),
            Self::Noop(reader) => reader.describe(),
        }
    }
}
