use crate::shared::types::{ClipboardHistoryItem, ClipboardPayload};

/// Everything the monitor and the history mutate, kept behind a single lock
///
/// Capture, copy-back and clear each run to completion while holding it, so a
/// write-back's echo value is always in place before the monitor looks at the
/// token change that write produced.
#[derive(Debug, Default)]
pub struct ClipboardState {
    /// Newest first, no two items with equal payloads
    pub items: Vec<ClipboardHistoryItem>,
    /// Value we last wrote to the clipboard ourselves, consumed by the next capture
    pub echo: Option<ClipboardPayload>,
    /// Last change token the monitor acted on
    pub last_seen_token: u64,
}

impl ClipboardState {
    pub fn position_of(&self, payload: &ClipboardPayload) -> Option<usize> {
        self.items.iter().position(|item| &item.payload == payload)
    }

    pub fn position_of_id(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }
}
