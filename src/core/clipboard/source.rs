use std::sync::Mutex;

use crate::shared::errors::{CommandError, CommandResult};
use crate::shared::types::{ClipboardKind, ClipboardPayload};

/// The OS-level shared clipboard slot
///
/// `change_token` must change every time anyone writes to the slot, including
/// through [`ClipboardSource::write`].
pub trait ClipboardSource: Send + Sync {
    /// Current change token. Never blocks and never mutates the slot.
    fn change_token(&self) -> u64;

    /// Read the first representation offered in `preferred` order, `None` if
    /// the slot holds nothing we capture.
    fn read_current(&self, preferred: &[ClipboardKind]) -> CommandResult<Option<ClipboardPayload>>;

    /// Replace the slot contents with `payload`.
    fn write(&self, payload: &ClipboardPayload) -> CommandResult<()>;
}

#[derive(Debug, Default)]
struct MemorySlot {
    token: u64,
    offers: Vec<ClipboardPayload>,
    unsupported: Option<String>,
    fail_reads: bool,
    fail_writes: bool,
}

/// In-process clipboard
///
/// Used when the OS clipboard can't be opened, and as the test double for the
/// monitor and the history.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    slot: Mutex<MemorySlot>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemorySlot> {
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Simulate another process copying `payload`
    pub fn external_write(&self, payload: ClipboardPayload) {
        self.offer(vec![payload]);
    }

    /// Simulate another process copying several representations at once
    pub fn offer(&self, offers: Vec<ClipboardPayload>) {
        let mut slot = self.lock();
        slot.offers = offers;
        slot.unsupported = None;
        slot.token += 1;
    }

    /// Simulate another process copying a format we don't capture (files, rich text...)
    pub fn offer_unsupported(&self, format: impl Into<String>) {
        let mut slot = self.lock();
        slot.offers.clear();
        slot.unsupported = Some(format.into());
        slot.token += 1;
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }
}

impl ClipboardSource for MemoryClipboard {
    fn change_token(&self) -> u64 {
        self.lock().token
    }

    fn read_current(&self, preferred: &[ClipboardKind]) -> CommandResult<Option<ClipboardPayload>> {
        let slot = self.lock();
        if slot.fail_reads {
            return Err(CommandError::SourceUnavailable("read denied".to_string()));
        }
        if let Some(format) = &slot.unsupported {
            return Err(CommandError::UnsupportedKind(format.clone()));
        }

        let found = preferred
            .iter()
            .find_map(|kind| slot.offers.iter().find(|offer| offer.kind() == *kind));
        Ok(found.cloned())
    }

    fn write(&self, payload: &ClipboardPayload) -> CommandResult<()> {
        let mut slot = self.lock();
        if slot.fail_writes {
            return Err(CommandError::SourceUnavailable("write denied".to_string()));
        }
        slot.offers = vec![payload.clone()];
        slot.unsupported = None;
        slot.token += 1;
        Ok(())
    }
}
