//! Mock device implementations for testing and development.
//!
//! This module provides simulated devices that can be controlled
//! programmatically without requiring physical hardware. Each mock comes as a
//! `(device, handle)` pair: the device is handed to the code under test, the
//! handle stays with the test to script behavior and observe effects.

pub mod link;
pub mod pin;

// Re-export commonly used types
pub use link::{ScriptedLink, ScriptedLinkHandle, ScriptedLinkOpener};
pub use pin::{MockPin, MockPinHandle, PinEvent};
