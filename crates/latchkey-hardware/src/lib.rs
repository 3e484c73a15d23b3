//! Hardware abstraction layer for the Latchkey door controller.
//!
//! This crate covers everything that touches a physical device: the
//! contactless tag reader and the digital outputs that drive door latches.
//!
//! # Readers
//!
//! [`TagReader`] is the async interface the rest of the system uses. Two
//! implementations ship here:
//!
//! - [`HardwareReader`](reader::HardwareReader) manages sessions on top of a
//!   chip driver supplied through [`LinkOpener`](traits::LinkOpener).
//! - [`NoopReader`](noop::NoopReader) reports an all-zero tag on every read,
//!   for running without hardware.
//!
//! [`AnyTagReader`](devices::AnyTagReader) dispatches between them and
//! [`SharedReader`](shared::SharedReader) lets several tasks use one reader.
//!
//! ```no_run
//! use latchkey_hardware::{SharedReader, TagReader};
//! use latchkey_hardware::noop::NoopReader;
//! use std::time::Duration;
//!
//! # async fn example() -> latchkey_hardware::Result<()> {
//! let mut reader = SharedReader::new(NoopReader::new());
//! reader.initialize().await?;
//! let uid = reader.read_uid(Duration::from_secs(5)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Output pins
//!
//! [`OutputPin`](traits::OutputPin) is a single synchronous digital output.
//! [`SysfsPin`](pin::SysfsPin) drives a Linux GPIO line.
//!
//! # Mock Implementations
//!
//! The [`mock`] module provides a scripted reader link and a recording pin
//! for tests and development without physical hardware.

pub mod devices;
pub mod error;
pub mod format;
pub mod mock;
pub mod noop;
pub mod pin;
pub mod reader;
pub mod shared;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use devices::AnyTagReader;
pub use error::{HardwareError, Result};
pub use shared::SharedReader;
pub use traits::{LinkOpener, OutputPin, ReaderLink, TagReader};
pub use types::{AuthBlock, BlocksAccess, Level, SectorKey};
