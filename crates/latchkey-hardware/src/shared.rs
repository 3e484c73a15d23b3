//! Reader shared between the access loop and on-demand reads.
//!
//! One physical reader serves two consumers: the access decision loop and
//! the on-demand read service. [`SharedReader`] serializes them behind an
//! async mutex so a reinitialization never interleaves with another task's
//! read. The lock is taken per operation, not per protocol run.
//!
//! Tokio's mutex is fair (FIFO), but a loop that immediately retries after
//! releasing the lock can still starve an on-demand caller of the *tag*:
//! whichever read is in flight when the card arrives consumes it.

use crate::devices::AnyTagReader;
use crate::error::Result;
use crate::traits::TagReader;
use crate::types::AuthBlock;
use latchkey_core::constants::NUM_BYTES_PER_BLOCK;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

/// Cloneable handle to a single reader.
#[derive(Debug, Clone)]
pub struct SharedReader {
    inner: Arc<Mutex<AnyTagReader>>,
}

impl SharedReader {
    pub fn new(reader: impl Into<AnyTagReader>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(reader.into())),
        }
    }

    /// Hold the reader across several operations.
    pub async fn lock(&self) -> MutexGuard<'_, AnyTagReader> {
        self.inner.lock().await
    }
}

impl TagReader for SharedReader {
    async fn initialize(&mut self) -> Result<()> {
        self.inner.lock().await.initialize().await
    }

    async fn halt(&mut self) -> Result<()> {
        self.inner.lock().await.halt().await
    }

    async fn read_uid(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        self.inner.lock().await.read_uid(timeout).await
    }

    async fn read_data_blocks(&mut self, timeout: Duration, sector: usize) -> Result<Vec<u8>> {
        self.inner.lock().await.read_data_blocks(timeout, sector).await
    }

    async fn read_data_block(
        &mut self,
        timeout: Duration,
        sector: usize,
        block: usize,
    ) -> Result<[u8; NUM_BYTES_PER_BLOCK]> {
        self.inner
            .lock()
            .await
            .read_data_block(timeout, sector, block)
            .await
    }

    async fn read_auth_block(&mut self, timeout: Duration, sector: usize) -> Result<AuthBlock> {
        self.inner.lock().await.read_auth_block(timeout, sector).await
    }

    fn describe(&self) -> String {
        match self.inner.try_lock() {
            Ok(reader) => reader.describe(),
            Err(_) => "SharedReader (busy)".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedLink;
    use crate::noop::NoopReader;
    use crate::reader::{HardwareReader, ReaderConfig};

    #[tokio::test]
    async fn test_clones_share_one_session() {
        let (opener, handle) = ScriptedLink::new();
        let reader = SharedReader::new(HardwareReader::new(opener, ReaderConfig::default()));
        let mut loop_side = reader.clone();
        let mut api_side = reader.clone();

        loop_side.initialize().await.unwrap();
        handle.push_uid(vec![0x01, 0x02, 0x03, 0x04]);

        let uid = api_side.read_uid(Duration::from_secs(1)).await.unwrap();
        assert_eq!(uid, vec![0x01, 0x02, 0x03, 0x04]);
        assert_eq!(handle.opens(), 1);
    }

    #[tokio::test]
    async fn test_describe_delegates() {
        let reader = SharedReader::new(NoopReader::new());
        assert_eq!(reader.describe(), "NoopReader");

        let _guard = reader.lock().await;
        assert_eq!(reader.describe(), "SharedReader (busy)");
    }
}
