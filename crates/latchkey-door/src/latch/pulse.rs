//! Latch that rests locked and opens for the requested duration.

use super::{LatchCommand, LatchHandle, drive};
use crate::handoff::{self, HandoffReceiver};
use latchkey_hardware::{Level, OutputPin};
use tracing::{debug, info};

#[derive(Debug)]
pub struct PulseLatch<P> {
    pin: P,
}

impl<P: OutputPin> PulseLatch<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    /// Start the latch task. The output is driven high immediately.
    pub fn spawn(self) -> LatchHandle {
        let name = self.pin.name().to_string();
        let (commands, receiver) = handoff::channel();
        let task = tokio::spawn(self.run(receiver));
        LatchHandle::new(name, commands, task)
    }

    async fn run(mut self, mut commands: HandoffReceiver<LatchCommand>) {
        info!(pin = %self.pin.name(), "Starting pulse latch");
        drive(&mut self.pin, Level::High);

        while let Some(command) = commands.recv().await {
            info!(
                pin = %self.pin.name(),
                duration_ms = command.unlock_duration.as_millis() as u64,
                "Holding latch open"
            );
            drive(&mut self.pin, Level::Low);
            tokio::time::sleep(command.unlock_duration).await;
            drive(&mut self.pin, Level::High);
        }

        debug!(pin = %self.pin.name(), "Pulse latch stopped");
    }
}
