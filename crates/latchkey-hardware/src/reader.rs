//! Hardware tag reader with session lifecycle management.
//!
//! [`HardwareReader`] owns at most one [`ReaderLink`] session at a time.
//! `initialize()` always destroys the current session before opening the next
//! one, which is how the read protocol recovers from IRQ faults. Driver calls
//! block on the bus, so each one runs on Tokio's blocking pool.
//!
//! ```text
//!            initialize()               initialize()
//!  (none) ──────────────► session #1 ──────────────► session #2
//!     ▲                       │                          │
//!     └──────── halt() ───────┴────────── halt() ────────┘
//! ```

use crate::error::{HardwareError, Result};
use crate::traits::{LinkOpener, ReaderLink, TagReader};
use crate::types::{AuthBlock, SectorKey};
use latchkey_core::constants::{
    DEFAULT_ANTENNA_GAIN, NUM_BYTES_PER_BLOCK, NUM_DATA_BLOCKS_PER_SECTOR, NUM_SECTORS,
};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for a [`HardwareReader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Antenna gain applied to every new session (0-7).
    pub antenna_gain: u8,

    /// Key used to authenticate every sector read.
    pub key: SectorKey,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            antenna_gain: DEFAULT_ANTENNA_GAIN,
            key: SectorKey::DEFAULT,
        }
    }
}

impl ReaderConfig {
    /// Set the antenna gain.
    pub fn antenna_gain(mut self, gain: u8) -> Self {
        self.antenna_gain = gain;
        self
    }

    /// Set the sector authentication key.
    pub fn key(mut self, key: SectorKey) -> Self {
        self.key = key;
        self
    }
}

fn lock_session(
    session: &Mutex<Option<ReaderSession>>,
) -> Result<MutexGuard<'_, Option<ReaderSession>>> {
    session
        .lock()
        .map_err(|_| HardwareError::other("reader session lock poisoned"))
}

/// Driver failures while opening a session are link errors. Errors that
/// already are link errors pass through unchanged.
fn link_error(context: &str, error: HardwareError) -> HardwareError {
    match error {
        HardwareError::Link { .. } => error,
        other => HardwareError::link(format!("{context}: {other}")),
    }
}

/// The live handle to the physical link.
struct ReaderSession {
    link: Box<dyn ReaderLink>,
    generation: u64,
}

/// Reader backed by a real chip driver.
///
/// # Examples
///
/// ```
/// use latchkey_hardware::mock::ScriptedLink;
/// use latchkey_hardware::reader::{HardwareReader, ReaderConfig};
/// use latchkey_hardware::traits::TagReader;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> latchkey_hardware::Result<()> {
/// let (opener, handle) = ScriptedLink::new();
/// handle.push_uid(vec![0x04, 0xAB, 0xCD, 0xEF]);
///
/// let mut reader = HardwareReader::new(opener, ReaderConfig::default());
/// reader.initialize().await?;
///
/// let uid = reader.read_uid(Duration::from_secs(1)).await?;
/// assert_eq!(uid, vec![0x04, 0xAB, 0xCD, 0xEF]);
///
/// reader.halt().await?;
/// # Ok(())
/// # }
/// ```
pub struct HardwareReader {
    opener: Arc<dyn LinkOpener>,
    session: Arc<Mutex<Option<ReaderSession>>>,
    config: ReaderConfig,
    generation: u64,
}

impl std::fmt::Debug for HardwareReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HardwareReader")
            .field("config", &self.config)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl HardwareReader {
    /// Create a reader. No session is opened until [`initialize`](TagReader::initialize).
    pub fn new(opener: impl LinkOpener + 'static, config: ReaderConfig) -> Self {
        Self {
            opener: Arc::new(opener),
            session: Arc::new(Mutex::new(None)),
            config,
            generation: 0,
        }
    }

    /// Whether a session is currently open.
    ///
    /// A session busy with a driver call counts as open.
    pub fn is_open(&self) -> bool {
        match self.session.try_lock() {
            Ok(guard) => guard.is_some(),
            Err(TryLockError::WouldBlock) => true,
            Err(TryLockError::Poisoned(_)) => false,
        }
    }

    /// Run a driver call against the open session on the blocking pool.
    async fn with_link<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn ReaderLink) -> Result<T> + Send + 'static,
    {
        let session = Arc::clone(&self.session);
        tokio::task::spawn_blocking(move || {
            let mut guard = lock_session(&session)?;
            let session = guard.as_mut().ok_or(HardwareError::NotInitialized)?;
            op(session.link.as_mut())
        })
        .await
        .map_err(|e| HardwareError::other(format!("reader task failed: {e}")))?
    }

    fn check_sector(sector: usize) -> Result<()> {
        if sector >= NUM_SECTORS {
            return Err(HardwareError::invalid_address(format!(
                "sector must be 0-{}, got {sector}",
                NUM_SECTORS - 1
            )));
        }
        Ok(())
    }

    fn check_block(block: usize) -> Result<()> {
        if block >= NUM_DATA_BLOCKS_PER_SECTOR {
            return Err(HardwareError::invalid_address(format!(
                "data block must be 0-{}, got {block}",
                NUM_DATA_BLOCKS_PER_SECTOR - 1
            )));
        }
        Ok(())
    }
}

impl TagReader for HardwareReader {
    async fn initialize(&mut self) -> Result<()> {
        if let Err(e) = self.halt().await {
            warn!(error = %e, "Failed to halt previous reader session, opening a new one anyway");
        }

        info!("Initializing reader");
        let opener = Arc::clone(&self.opener);
        let session = Arc::clone(&self.session);
        let gain = self.config.antenna_gain;
        let generation = self.generation + 1;

        let description = tokio::task::spawn_blocking(move || -> Result<String> {
            let mut link = opener
                .open()
                .map_err(|e| link_error("failed to open reader link", e))?;
            link.set_antenna_gain(gain)
                .map_err(|e| link_error("failed to set antenna gain", e))?;

            let description = link.describe();
            *lock_session(&session)? = Some(ReaderSession { link, generation });
            Ok(description)
        })
        .await
        .map_err(|e| HardwareError::other(format!("reader task failed: {e}")))??;

        self.generation = generation;
        info!(session = generation, device = %description, "Successfully initialized reader");
        Ok(())
    }

    async fn halt(&mut self) -> Result<()> {
        let session = Arc::clone(&self.session);

        // The session lock may still be held by a driver call whose caller
        // gave up on it, so it is only taken on the blocking pool.
        let halted = tokio::task::spawn_blocking(move || -> Result<Option<u64>> {
            let taken = lock_session(&session)?.take();
            let Some(mut session) = taken else {
                return Ok(None);
            };

            let halted = session.link.halt();
            let closed = session.link.close();
            halted.and(closed).map(|()| Some(session.generation))
        })
        .await
        .map_err(|e| HardwareError::other(format!("reader task failed: {e}")))??;

        match halted {
            Some(generation) => info!(session = generation, "Successfully halted reader"),
            None => debug!("Reader already halted"),
        }
        Ok(())
    }

    async fn read_uid(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        self.with_link(move |link| link.read_uid(timeout)).await
    }

    async fn read_data_blocks(&mut self, timeout: Duration, sector: usize) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(NUM_DATA_BLOCKS_PER_SECTOR * NUM_BYTES_PER_BLOCK);
        for block in 0..NUM_DATA_BLOCKS_PER_SECTOR {
            let bytes = self
                .read_data_block(timeout, sector, block)
                .await
                .inspect_err(|e| warn!(sector, block, error = %e, "Failed to read block"))?;
            data.extend_from_slice(&bytes);
        }
        Ok(data)
    }

    async fn read_data_block(
        &mut self,
        timeout: Duration,
        sector: usize,
        block: usize,
    ) -> Result<[u8; NUM_BYTES_PER_BLOCK]> {
        Self::check_sector(sector)?;
        Self::check_block(block)?;

        let key = self.config.key;
        self.with_link(move |link| link.read_block(timeout, sector, block, &key))
            .await
            .map_err(|e| HardwareError::sector_read(sector, block, e))
    }

    async fn read_auth_block(&mut self, timeout: Duration, sector: usize) -> Result<AuthBlock> {
        Self::check_sector(sector)?;

        let key = self.config.key;
        let trailer = self
            .with_link(move |link| link.read_trailer(timeout, sector, &key))
            .await
            .map_err(|e| HardwareError::sector_read(sector, NUM_DATA_BLOCKS_PER_SECTOR, e))?;

        Ok(AuthBlock::from_trailer(&trailer))
    }

    fn describe(&self) -> String {
        match self.session.try_lock() {
            Ok(guard) => guard
                .as_ref()
                .map(|s| s.link.describe())
                .unwrap_or_else(|| "HardwareReader (halted)".to_string()),
            Err(TryLockError::WouldBlock) => "HardwareReader (busy)".to_string(),
            Err(TryLockError::Poisoned(_)) => "HardwareReader (poisoned)".to_string(),
        }
    }
}
