//! OS clipboard adapter
//!
//! Reads and writes go through `arboard`. The change token comes from the
//! pasteboard's own counter on macOS. Elsewhere a `clipboard-rs` watcher thread
//! counts the change notifications the OS sends, so the token never touches the
//! clipboard contents.

use std::borrow::Cow;
use std::sync::{Mutex, MutexGuard};
#[cfg(not(target_os = "macos"))]
use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(not(target_os = "macos"))]
use std::sync::Arc;

#[cfg(not(target_os = "macos"))]
use clipboard_rs::{ClipboardHandler, ClipboardWatcher, ClipboardWatcherContext, WatcherShutdown};

use crate::shared::errors::{CommandError, CommandResult};
use crate::shared::types::{ClipboardKind, ClipboardPayload, ImagePayload};
use super::source::ClipboardSource;

pub struct SystemClipboard {
    clipboard: Mutex<arboard::Clipboard>,
    #[cfg(not(target_os = "macos"))]
    changes: Arc<AtomicU64>,
    #[cfg(not(target_os = "macos"))]
    watcher: Mutex<Option<WatcherShutdown>>,
}

impl SystemClipboard {
    pub fn new() -> CommandResult<Self> {
        let clipboard = arboard::Clipboard::new().map_err(|e| {
            CommandError::SourceUnavailable(format!("Failed to open system clipboard: {}", e))
        })?;

        Self::from_clipboard(clipboard)
    }

    #[cfg(target_os = "macos")]
    fn from_clipboard(clipboard: arboard::Clipboard) -> CommandResult<Self> {
        Ok(Self {
            clipboard: Mutex::new(clipboard),
        })
    }

    #[cfg(not(target_os = "macos"))]
    fn from_clipboard(clipboard: arboard::Clipboard) -> CommandResult<Self> {
        let changes = Arc::new(AtomicU64::new(0));
        let watcher = spawn_watcher(ChangeCounter { changes: changes.clone() })?;
        Ok(Self {
            clipboard: Mutex::new(clipboard),
            changes,
            watcher: Mutex::new(Some(watcher)),
        })
    }

    fn lock_clipboard(&self) -> MutexGuard<'_, arboard::Clipboard> {
        match self.clipboard.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("clipboard mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

#[cfg(not(target_os = "macos"))]
impl Drop for SystemClipboard {
    fn drop(&mut self) {
        let watcher = match self.watcher.get_mut() {
            Ok(watcher) => watcher.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(shutdown) = watcher {
            shutdown.stop();
            tracing::debug!("clipboard watcher stopped");
        }
    }
}

/// Bumps the shared counter on every OS change notification, including
/// notifications for content identical to what was there before
#[cfg(not(target_os = "macos"))]
struct ChangeCounter {
    changes: Arc<AtomicU64>,
}

#[cfg(not(target_os = "macos"))]
impl ClipboardHandler for ChangeCounter {
    fn on_clipboard_change(&mut self) {
        let token = self.changes.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::trace!(token, "clipboard change notification");
    }
}

#[cfg(not(target_os = "macos"))]
fn spawn_watcher(counter: ChangeCounter) -> CommandResult<WatcherShutdown> {
    let mut context = ClipboardWatcherContext::new().map_err(|e| {
        CommandError::SourceUnavailable(format!("Failed to watch system clipboard: {}", e))
    })?;
    let shutdown = context.add_handler(counter).get_shutdown_channel();

    std::thread::Builder::new()
        .name("clipboard-watcher".to_string())
        .spawn(move || {
            tracing::debug!("clipboard watcher started");
            context.start_watch();
        })?;

    Ok(shutdown)
}

impl ClipboardSource for SystemClipboard {
    #[cfg(target_os = "macos")]
    fn change_token(&self) -> u64 {
        use cocoa::base::{id, nil};
        use cocoa::foundation::NSInteger;
        use objc::{class, msg_send, sel, sel_impl};

        unsafe {
            let pb: id = msg_send![class!(NSPasteboard), generalPasteboard];
            if pb == nil {
                return 0;
            }
            let count: NSInteger = msg_send![pb, changeCount];
            count as u64
        }
    }

    #[cfg(not(target_os = "macos"))]
    fn change_token(&self) -> u64 {
        self.changes.load(Ordering::SeqCst)
    }

    fn read_current(&self, preferred: &[ClipboardKind]) -> CommandResult<Option<ClipboardPayload>> {
        let mut clipboard = self.lock_clipboard();
        let mut unsupported = None;

        for kind in preferred {
            match read_kind(&mut clipboard, *kind) {
                Ok(Some(payload)) => return Ok(Some(payload)),
                Ok(None) => {}
                Err(arboard::Error::ConversionFailure) => {
                    tracing::debug!(%kind, "clipboard content could not be converted");
                    unsupported = Some(*kind);
                }
                Err(e) => return Err(CommandError::SourceUnavailable(e.to_string())),
            }
        }

        match unsupported {
            Some(kind) => Err(CommandError::UnsupportedKind(format!("unreadable {} data", kind))),
            None => Ok(None),
        }
    }

    fn write(&self, payload: &ClipboardPayload) -> CommandResult<()> {
        let mut clipboard = self.lock_clipboard();
        let result = match payload {
            ClipboardPayload::Text(text) => clipboard.set_text(text.as_str()),
            ClipboardPayload::Image(image) => clipboard.set_image(arboard::ImageData {
                width: image.width,
                height: image.height,
                bytes: Cow::Borrowed(&image.bytes[..]),
            }),
        };
        // The watcher sees our own write like any other, so the token moves
        // once the OS reports it
        result.map_err(|e| CommandError::SourceUnavailable(format!("Failed to write to clipboard: {}", e)))
    }
}

fn read_kind(
    clipboard: &mut arboard::Clipboard,
    kind: ClipboardKind,
) -> Result<Option<ClipboardPayload>, arboard::Error> {
    let read = match kind {
        ClipboardKind::Text => clipboard.get_text().map(ClipboardPayload::Text),
        ClipboardKind::Image => clipboard.get_image().map(|image| {
            ClipboardPayload::Image(ImagePayload::new(image.width, image.height, image.bytes.into_owned()))
        }),
    };

    match read {
        Ok(ClipboardPayload::Text(text)) if text.is_empty() => Ok(None),
        Ok(payload) => Ok(Some(payload)),
        Err(arboard::Error::ContentNotAvailable) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(all(test, not(target_os = "macos")))]
mod tests {
    use super::*;

    #[test]
    fn test_every_notification_advances_token() {
        let changes = Arc::new(AtomicU64::new(0));
        let mut counter = ChangeCounter { changes: changes.clone() };

        // Copying the same text twice still sends two notifications
        counter.on_clipboard_change();
        counter.on_clipboard_change();

        assert_eq!(changes.load(Ordering::SeqCst), 2);
    }
}
