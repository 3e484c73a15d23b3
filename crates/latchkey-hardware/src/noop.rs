//! Reader used when no hardware is attached.
//!
//! Every read succeeds immediately: the identifier is sixteen zero bytes,
//! data blocks are zero-filled, and every trailer reports a hidden KeyA, the
//! factory KeyB and all-zero access bits. This lets the whole controller run
//! on a development machine.

use crate::error::Result;
use crate::traits::TagReader;
use crate::types::{AuthBlock, BlocksAccess, SectorKey};
use latchkey_core::constants::{
    NOOP_UID_LENGTH, NUM_BYTES_PER_BLOCK, NUM_DATA_BYTES_PER_SECTOR,
};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Default, Clone)]
pub struct NoopReader {
    initialized: bool,
}

impl NoopReader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TagReader for NoopReader {
    async fn initialize(&mut self) -> Result<()> {
        self.initialized = true;
        debug!("noop reader initialized");
        Ok(())
    }

    async fn halt(&mut self) -> Result<()> {
        self.initialized = false;
        Ok(())
    }

    async fn read_uid(&mut self, _timeout: Duration) -> Result<Vec<u8>> {
        Ok(vec![0; NOOP_UID_LENGTH])
    }

    async fn read_data_blocks(&mut self, _timeout: Duration, _sector: usize) -> Result<Vec<u8>> {
        Ok(vec![0; NUM_DATA_BYTES_PER_SECTOR])
    }

    async fn read_data_block(
        &mut self,
        _timeout: Duration,
        _sector: usize,
        _block: usize,
    ) -> Result<[u8; NUM_BYTES_PER_BLOCK]> {
        Ok([0; NUM_BYTES_PER_BLOCK])
    }

    async fn read_auth_block(&mut self, _timeout: Duration, _sector: usize) -> Result<AuthBlock> {
        Ok(AuthBlock {
            key_a: SectorKey::ZERO,
            key_b: SectorKey::DEFAULT,
            permissions: BlocksAccess::default(),
        })
    }

    fn describe(&self) -> String {
        "NoopReader".to_string()
    }
}
