//! Scripted reader link for exercising the read protocol.
//!
//! The link replays a queue of `read_uid` outcomes (tags, IRQ faults,
//! timeouts, empty results) and serves sector data from an in-memory card
//! image. Every session opened through the [`ScriptedLinkOpener`] shares the
//! same script, so the queue survives reinitialization just like a real card
//! stays in the field while the chip is reset.

use crate::error::{HardwareError, Result};
use crate::traits::{LinkOpener, ReaderLink};
use crate::types::SectorKey;
use latchkey_core::constants::{NUM_BYTES_PER_BLOCK, NUM_DATA_BLOCKS_PER_SECTOR};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Trailer of a blank card: hidden KeyA, transport access bits, default KeyB.
const TRANSPORT_TRAILER: [u8; NUM_BYTES_PER_BLOCK] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0x07, 0x80, 0x69, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF,
];

#[derive(Debug, Clone)]
enum UidOutcome {
    Uid(Vec<u8>),
    Irq,
    Timeout,
    Error(String),
}

#[derive(Debug, Clone)]
enum Failure {
    Irq,
    Timeout,
    Other(String),
}

impl Failure {
    fn from_error(error: &HardwareError) -> Self {
        match error {
            HardwareError::Irq => Self::Irq,
            HardwareError::Timeout { .. } => Self::Timeout,
            other => Self::Other(other.to_string()),
        }
    }

    fn to_error(&self, timeout: Duration) -> HardwareError {
        match self {
            Self::Irq => HardwareError::Irq,
            Self::Timeout => HardwareError::timeout(timeout.as_millis() as u64),
            Self::Other(message) => HardwareError::other(message.clone()),
        }
    }
}

#[derive(Debug)]
struct BlockFailure {
    failure: Failure,
    remaining: Option<usize>,
}

#[derive(Debug, Default)]
struct ScriptState {
    uid_script: VecDeque<UidOutcome>,
    blocks: HashMap<(usize, usize), [u8; NUM_BYTES_PER_BLOCK]>,
    failures: HashMap<(usize, usize), BlockFailure>,
    open_failure: Option<String>,
    antenna_gain: Option<u8>,
    read_delay: Duration,
    opens: usize,
    halts: usize,
    closes: usize,
    uid_reads: usize,
}

fn lock(state: &Mutex<ScriptState>) -> MutexGuard<'_, ScriptState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Scripted reader link.
///
/// # Examples
///
/// ```
/// use latchkey_hardware::mock::ScriptedLink;
/// use latchkey_hardware::traits::{LinkOpener, ReaderLink};
/// use std::time::Duration;
///
/// let (opener, handle) = ScriptedLink::new();
/// handle.push_irq();
/// handle.push_uid(vec![0x01, 0x02, 0x03, 0x04]);
///
/// let mut link = opener.open().unwrap();
/// assert!(link.read_uid(Duration::from_secs(1)).unwrap_err().is_irq());
/// assert_eq!(link.read_uid(Duration::from_secs(1)).unwrap(), vec![1, 2, 3, 4]);
/// // Script exhausted: nobody is in front of the reader.
/// assert!(link.read_uid(Duration::from_secs(1)).unwrap_err().is_timeout());
/// ```
#[derive(Debug)]
pub struct ScriptedLink {
    state: Arc<Mutex<ScriptState>>,
    session: usize,
}

impl ScriptedLink {
    /// Create an opener for scripted sessions and the handle that scripts them.
    pub fn new() -> (ScriptedLinkOpener, ScriptedLinkHandle) {
        let state = Arc::new(Mutex::new(ScriptState::default()));
        (
            ScriptedLinkOpener {
                state: Arc::clone(&state),
            },
            ScriptedLinkHandle { state },
        )
    }

    fn read(
        &self,
        timeout: Duration,
        sector: usize,
        block: usize,
    ) -> Result<[u8; NUM_BYTES_PER_BLOCK]> {
        let mut state = lock(&self.state);

        if let Some(entry) = state.failures.get_mut(&(sector, block)) {
            let error = entry.failure.to_error(timeout);
            match entry.remaining.as_mut() {
                Some(0) => {}
                Some(n) => {
                    *n -= 1;
                    return Err(error);
                }
                None => return Err(error),
            }
        }

        let default = if block == NUM_DATA_BLOCKS_PER_SECTOR {
            TRANSPORT_TRAILER
        } else {
            [0u8; NUM_BYTES_PER_BLOCK]
        };
        Ok(state.blocks.get(&(sector, block)).copied().unwrap_or(default))
    }
}

impl ReaderLink for ScriptedLink {
    fn set_antenna_gain(&mut self, gain: u8) -> Result<()> {
        lock(&self.state).antenna_gain = Some(gain);
        Ok(())
    }

    fn read_uid(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        let delay = lock(&self.state).read_delay;
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let mut state = lock(&self.state);
        state.uid_reads += 1;

        match state.uid_script.pop_front() {
            Some(UidOutcome::Uid(uid)) => Ok(uid),
            Some(UidOutcome::Irq) => Err(HardwareError::Irq),
            Some(UidOutcome::Error(message)) => Err(HardwareError::other(message)),
            Some(UidOutcome::Timeout) | None => {
                Err(HardwareError::timeout(timeout.as_millis() as u64))
            }
        }
    }

    fn read_block(
        &mut self,
        timeout: Duration,
        sector: usize,
        block: usize,
        _key: &SectorKey,
    ) -> Result<[u8; NUM_BYTES_PER_BLOCK]> {
        self.read(timeout, sector, block)
    }

    fn read_trailer(
        &mut self,
        timeout: Duration,
        sector: usize,
        _key: &SectorKey,
    ) -> Result<[u8; NUM_BYTES_PER_BLOCK]> {
        self.read(timeout, sector, NUM_DATA_BLOCKS_PER_SECTOR)
    }

    fn halt(&mut self) -> Result<()> {
        lock(&self.state).halts += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        lock(&self.state).closes += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("ScriptedLink session #{}", self.session)
    }
}

/// Opens [`ScriptedLink`] sessions sharing one script.
#[derive(Debug, Clone)]
pub struct ScriptedLinkOpener {
    state: Arc<Mutex<ScriptState>>,
}

impl LinkOpener for ScriptedLinkOpener {
    fn open(&self) -> Result<Box<dyn ReaderLink>> {
        let mut state = lock(&self.state);
        if let Some(message) = state.open_failure.take() {
            return Err(HardwareError::link(message));
        }

        state.opens += 1;
        Ok(Box::new(ScriptedLink {
            state: Arc::clone(&self.state),
            session: state.opens,
        }))
    }
}

/// Handle for scripting a [`ScriptedLink`] and observing its sessions.
#[derive(Debug, Clone)]
pub struct ScriptedLinkHandle {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedLinkHandle {
    /// Queue a successful identifier read.
    pub fn push_uid(&self, uid: Vec<u8>) {
        lock(&self.state).uid_script.push_back(UidOutcome::Uid(uid));
    }

    /// Queue a zero-length identifier returned without an error.
    pub fn push_empty(&self) {
        lock(&self.state).uid_script.push_back(UidOutcome::Uid(Vec::new()));
    }

    /// Queue an IRQ fault.
    pub fn push_irq(&self) {
        lock(&self.state).uid_script.push_back(UidOutcome::Irq);
    }

    /// Queue a timeout. An exhausted script also times out.
    pub fn push_timeout(&self) {
        lock(&self.state).uid_script.push_back(UidOutcome::Timeout);
    }

    /// Queue an unclassified failure.
    pub fn push_error(&self, message: impl Into<String>) {
        lock(&self.state)
            .uid_script
            .push_back(UidOutcome::Error(message.into()));
    }

    /// Make the next session open fail with a link error.
    pub fn fail_next_open(&self, message: impl Into<String>) {
        lock(&self.state).open_failure = Some(message.into());
    }

    /// Store the contents of a data block.
    pub fn set_block(&self, sector: usize, block: usize, data: [u8; NUM_BYTES_PER_BLOCK]) {
        lock(&self.state).blocks.insert((sector, block), data);
    }

    /// Store the raw trailer of a sector.
    pub fn set_trailer(&self, sector: usize, trailer: [u8; NUM_BYTES_PER_BLOCK]) {
        self.set_block(sector, NUM_DATA_BLOCKS_PER_SECTOR, trailer);
    }

    /// Make every read of a block fail. Block 3 is the trailer.
    pub fn fail_block(&self, sector: usize, block: usize, error: HardwareError) {
        lock(&self.state).failures.insert(
            (sector, block),
            BlockFailure {
                failure: Failure::from_error(&error),
                remaining: None,
            },
        );
    }

    /// Make the next `times` reads of a block fail, then succeed.
    pub fn fail_block_times(&self, sector: usize, block: usize, error: HardwareError, times: usize) {
        lock(&self.state).failures.insert(
            (sector, block),
            BlockFailure {
                failure: Failure::from_error(&error),
                remaining: Some(times),
            },
        );
    }

    /// Make every `read_uid` block the calling thread for `delay` first,
    /// like a chip waiting for a tag.
    pub fn delay_reads(&self, delay: Duration) {
        lock(&self.state).read_delay = delay;
    }

    /// Last antenna gain configured on any session.
    pub fn antenna_gain(&self) -> Option<u8> {
        lock(&self.state).antenna_gain
    }

    /// Number of sessions opened.
    pub fn opens(&self) -> usize {
        lock(&self.state).opens
    }

    /// Number of chip halts.
    pub fn halts(&self) -> usize {
        lock(&self.state).halts
    }

    /// Number of ports closed.
    pub fn closes(&self) -> usize {
        lock(&self.state).closes
    }

    /// Sessions opened and not yet closed.
    pub fn open_sessions(&self) -> usize {
        let state = lock(&self.state);
        state.opens.saturating_sub(state.closes)
    }

    /// Number of identifier reads attempted.
    pub fn uid_reads(&self) -> usize {
        lock(&self.state).uid_reads
    }

    /// Outcomes still queued.
    pub fn pending(&self) -> usize {
        lock(&self.state).uid_script.len()
    }
}
