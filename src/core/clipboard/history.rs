use std::sync::{Arc, Mutex, MutexGuard};

use crate::shared::emit::EventBus;
use crate::shared::errors::{CommandError, CommandResult};
use crate::shared::events::AppEvent;
use crate::shared::settings::ClipboardSettings;
use crate::shared::types::{ClipboardHistoryItem, ClipboardPayload};
use super::source::ClipboardSource;
use super::state::ClipboardState;

/// What `capture` did with a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// New value, added at the front
    Inserted,
    /// Already in history, moved to the front keeping its id
    Promoted,
    /// The value we just wrote back ourselves, dropped
    EchoSuppressed,
}

/// Clipboard history manager
///
/// Ordered newest first, deduplicated by payload, bounded by `capacity`.
/// Clones share the same state.
#[derive(Clone)]
pub struct ClipboardHistory {
    state: Arc<Mutex<ClipboardState>>,
    source: Arc<dyn ClipboardSource>,
    capacity: usize,
    events: EventBus,
}

impl ClipboardHistory {
    /// Create an empty history writing back through `source`
    pub fn new(source: Arc<dyn ClipboardSource>, capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(ClipboardState::default())),
            source,
            capacity: capacity.max(1),
            events: EventBus::new(),
        }
    }

    pub fn with_settings(source: Arc<dyn ClipboardSource>, settings: &ClipboardSettings) -> Self {
        Self::new(source, settings.capacity)
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, ClipboardState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("history mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub(crate) fn source(&self) -> &Arc<dyn ClipboardSource> {
        &self.source
    }

    pub(crate) fn events(&self) -> &EventBus {
        &self.events
    }

    /// Record a value read from the clipboard
    pub fn capture(&self, payload: ClipboardPayload) -> CaptureOutcome {
        let mut state = self.lock_state();
        self.capture_locked(&mut state, payload)
    }

    /// Insert-or-promote on an already locked state, used by the monitor so that
    /// the token check and the capture happen in one step
    pub(crate) fn capture_locked(&self, state: &mut ClipboardState, payload: ClipboardPayload) -> CaptureOutcome {
        // Only a matching change consumes the echo. Anything else leaves it for
        // the change our own write is still due to cause.
        if state.echo.as_ref() == Some(&payload) {
            state.echo = None;
            tracing::debug!(kind = %payload.kind(), "ignoring echo of our own clipboard write");
            return CaptureOutcome::EchoSuppressed;
        }

        // Already the newest item: nothing moves, nothing to announce
        if state.position_of(&payload) == Some(0) {
            tracing::debug!(kind = %payload.kind(), "clipboard value already newest");
            return CaptureOutcome::Promoted;
        }

        let (item, outcome) = match state.position_of(&payload) {
            Some(index) => (state.items.remove(index), CaptureOutcome::Promoted),
            None => (ClipboardHistoryItem::new(payload), CaptureOutcome::Inserted),
        };
        state.items.insert(0, item.clone());

        if state.items.len() > self.capacity {
            let evicted = state.items.split_off(self.capacity);
            tracing::debug!(count = evicted.len(), "evicted oldest clipboard items");
        }

        tracing::info!(
            id = %item.id,
            kind = %item.kind(),
            bytes = item.payload.byte_len(),
            ?outcome,
            "clipboard captured"
        );

        let event = match outcome {
            CaptureOutcome::Promoted => AppEvent::ItemPromoted(item),
            _ => AppEvent::ItemCaptured(item),
        };
        self.events.emit(event);
        outcome
    }

    /// Put a history item back on the clipboard
    ///
    /// The history itself is left as is. The clipboard change this write causes
    /// is recognised by the next capture and dropped.
    pub fn copy_to_clipboard(&self, id: &str) -> CommandResult<()> {
        let mut state = self.lock_state();
        let item = match state.position_of_id(id) {
            Some(index) => state.items[index].clone(),
            None => {
                tracing::debug!(id, "copy requested for an item no longer in history");
                return Err(CommandError::StaleReference(id.to_string()));
            }
        };

        match self.source.write(&item.payload) {
            Ok(()) => {
                tracing::info!(id, kind = %item.kind(), "copied history item to clipboard");
                state.echo = Some(item.payload);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(id, error = %e, "failed to copy history item to clipboard");
                state.echo = None;
                Err(e)
            }
        }
    }

    /// Remove a single item
    pub fn remove_item(&self, id: &str) -> CommandResult<()> {
        let mut state = self.lock_state();
        let index = state
            .position_of_id(id)
            .ok_or_else(|| CommandError::StaleReference(id.to_string()))?;
        state.items.remove(index);
        drop(state);

        tracing::debug!(id, "removed clipboard item");
        self.events.emit(AppEvent::ItemRemoved { id: id.to_string() });
        Ok(())
    }

    /// Clear all history. Pending echo state and the monitor's token are kept.
    pub fn clear(&self) {
        let cleared = {
            let mut state = self.lock_state();
            std::mem::take(&mut state.items).len()
        };
        tracing::info!(count = cleared, "cleared clipboard history");
        self.events.emit(AppEvent::HistoryCleared);
    }

    /// Current items, newest first
    pub fn snapshot(&self) -> Vec<ClipboardHistoryItem> {
        self.lock_state().items.clone()
    }

    /// Get a specific item by index (0 = most recent)
    pub fn get_item(&self, index: usize) -> Option<ClipboardHistoryItem> {
        self.lock_state().items.get(index).cloned()
    }

    pub fn get_item_by_id(&self, id: &str) -> Option<ClipboardHistoryItem> {
        let state = self.lock_state();
        state.position_of_id(id).map(|index| state.items[index].clone())
    }

    pub fn count(&self) -> usize {
        self.lock_state().items.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Receive an [`AppEvent`] after every change to the history
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<AppEvent> {
        self.events.subscribe()
    }
}
