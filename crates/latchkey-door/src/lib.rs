//! Door and latch subsystem for the Latchkey controller.
//!
//! A [`Door`](door::Door) turns the two authorization outcomes into latch
//! unlocks. Latches own their output pins and run as independent tasks:
//!
//! - [`PulseLatch`](latch::PulseLatch): rests locked, opens on command.
//! - [`TimedLatch`](latch::TimedLatch): rests unlocked inside a daily
//!   [`TimeWindow`](time_window::TimeWindow), locked outside it.
//! - [`MultiLatch`](latch::MultiLatch): forwards an unlock to several latches.
//!
//! All command paths use a drop-on-busy [`handoff`]: a signal or unlock
//! arriving while its receiver is busy is discarded, never queued.
//!
//! # Example
//!
//! ```
//! use latchkey_door::door::{Door, LatchDoor};
//! use latchkey_door::latch::PulseLatch;
//! use latchkey_hardware::mock::MockPin;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let (pin, _handle) = MockPin::new("main");
//! let door = LatchDoor::spawn(PulseLatch::new(pin).spawn().into(), None, Duration::from_secs(3));
//!
//! door.auth_ok().unwrap();
//! door.shutdown().await;
//! # }
//! ```

pub mod clock;
pub mod door;
pub mod error;
pub mod handoff;
pub mod latch;
pub mod time_window;

pub use clock::{Clock, SystemClock, VirtualClock};
pub use door::{AnyDoor, Door, DoorConfig, LatchDoor, NoopDoor};
pub use error::{LatchError, Result};
pub use handoff::Handoff;
pub use latch::{AnyLatch, Latch, LatchHandle, MultiLatch, PulseLatch, TimedLatch};
pub use time_window::TimeWindow;
