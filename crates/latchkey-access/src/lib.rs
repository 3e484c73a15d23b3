//! Access decisions for the Latchkey door controller.
//!
//! - [`read_next_tag`]: the read protocol, recovering from IRQ faults and
//!   turning timeouts into "no tag".
//! - [`AccessLoop`]: the background task that reads tags, asks an
//!   [`AccessAuthorizer`](latchkey_core::AccessAuthorizer) and signals the
//!   door.
//! - [`ReadTagService`]: one-shot reads for API callers, on the same reader.

pub mod access_loop;
pub mod error;
pub mod protocol;
pub mod service;

pub use access_loop::{AccessLoop, AccessLoopConfig, AccessLoopHandle, AccessLoopStats, LoopExit};
pub use error::{AccessError, Result};
pub use protocol::read_next_tag;
pub use service::{ApiResponse, ReadTagService, TagInfo, TagState, handle_read_next_tag, parse_timeout};
