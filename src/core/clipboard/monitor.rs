use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::shared::errors::{CommandError, CommandResult};
use crate::shared::events::AppEvent;
use crate::shared::settings::ClipboardSettings;
use crate::shared::types::ClipboardKind;
use super::history::{CaptureOutcome, ClipboardHistory};

/// Failed reads in a row before polling slows down
const MAX_CONSECUTIVE_ERRORS: u32 = 10;
const MAX_POLL_INTERVAL_MS: u64 = 5000;

/// Result of a single polling cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Token unchanged since the last cycle
    Unchanged,
    /// Token changed but the clipboard holds nothing we capture
    Empty,
    /// Token changed while monitoring is disabled
    Paused,
    Captured(CaptureOutcome),
}

/// Clipboard monitor that polls the change token
#[derive(Clone)]
pub struct ClipboardMonitor {
    enabled: Arc<AtomicBool>,
    history: ClipboardHistory,
    preferred: Arc<[ClipboardKind]>,
    interval: Duration,
}

impl ClipboardMonitor {
    /// Create a monitor feeding `history`
    ///
    /// The current token is taken as already seen, so whatever is on the
    /// clipboard right now is never captured.
    pub fn new(history: ClipboardHistory, settings: &ClipboardSettings) -> Self {
        let token = history.source().change_token();
        history.lock_state().last_seen_token = token;
        tracing::debug!(token, "clipboard monitor armed");

        Self {
            enabled: Arc::new(AtomicBool::new(true)),
            history,
            preferred: settings.preferred_kinds.clone().into(),
            interval: settings.poll_interval(),
        }
    }

    /// Run one polling cycle
    ///
    /// Comparing and updating the token happens under the history lock, so a
    /// transition is handled exactly once however the cycles get scheduled.
    pub fn tick(&self) -> CommandResult<PollOutcome> {
        let mut state = self.history.lock_state();
        let source = self.history.source();

        let token = source.change_token();
        if token == state.last_seen_token {
            return Ok(PollOutcome::Unchanged);
        }
        let previous = std::mem::replace(&mut state.last_seen_token, token);

        if !self.is_enabled() {
            // Whatever changed while paused, including our own write-back, is skipped
            state.echo = None;
            return Ok(PollOutcome::Paused);
        }

        match source.read_current(&self.preferred) {
            Ok(Some(payload)) => Ok(PollOutcome::Captured(self.history.capture_locked(&mut state, payload))),
            Ok(None) => Ok(PollOutcome::Empty),
            Err(CommandError::UnsupportedKind(format)) => {
                tracing::debug!(%format, "ignoring unsupported clipboard content");
                Ok(PollOutcome::Empty)
            }
            Err(e) => {
                // Leave the transition pending so the next cycle reads it again
                state.last_seen_token = previous;
                Err(e)
            }
        }
    }

    /// Start polling on the tokio runtime
    pub fn start(&self) -> MonitorHandle {
        let monitor = self.clone();
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            tracing::info!(interval_ms = monitor.interval.as_millis() as u64, "clipboard monitoring started");
            let mut consecutive_errors = 0u32;

            loop {
                let sleep_interval = match monitor.tick() {
                    Ok(outcome) => {
                        consecutive_errors = 0;
                        if outcome != PollOutcome::Unchanged {
                            tracing::trace!(?outcome, "clipboard change handled");
                        }
                        monitor.interval
                    }
                    Err(e) => {
                        consecutive_errors += 1;

                        // Only log errors occasionally to avoid spam
                        if consecutive_errors == 1 || consecutive_errors % 10 == 0 {
                            tracing::warn!(error = %e, consecutive_errors, "failed to read clipboard");
                        }
                        if consecutive_errors == MAX_CONSECUTIVE_ERRORS {
                            tracing::warn!("too many consecutive errors, reducing polling frequency");
                        }
                        backoff_interval(monitor.interval, consecutive_errors)
                    }
                };

                tokio::select! {
                    _ = tokio::time::sleep(sleep_interval) => {}
                    _ = shutdown_rx.changed() => break,
                }
            }

            tracing::info!("clipboard monitoring stopped");
        });

        MonitorHandle { shutdown, task }
    }

    /// Enable clipboard monitoring
    pub fn enable(&self) {
        self.set_enabled(true);
    }

    /// Disable clipboard monitoring
    pub fn disable(&self) {
        self.set_enabled(false);
    }

    /// Toggle monitoring on/off, returning the new state
    pub fn toggle(&self) -> bool {
        let enabled = !self.enabled.fetch_xor(true, Ordering::SeqCst);
        self.announce(enabled);
        enabled
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn history(&self) -> &ClipboardHistory {
        &self.history
    }

    fn set_enabled(&self, enabled: bool) {
        if self.enabled.swap(enabled, Ordering::SeqCst) != enabled {
            self.announce(enabled);
        }
    }

    fn announce(&self, enabled: bool) {
        tracing::info!(enabled, "clipboard monitoring toggled");
        self.history.events().emit(AppEvent::MonitorToggled(enabled));
    }
}

/// Handle to a running monitor loop
pub struct MonitorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Stop scheduling new cycles and wait for the loop to exit
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "clipboard monitor task ended abnormally");
        }
    }
}

/// Exponential backoff once reads keep failing, capped at 5s
fn backoff_interval(base: Duration, consecutive_errors: u32) -> Duration {
    if consecutive_errors < MAX_CONSECUTIVE_ERRORS {
        return base;
    }
    let exponent = (consecutive_errors - MAX_CONSECUTIVE_ERRORS).min(4);
    let ceiling = Duration::from_millis(MAX_POLL_INTERVAL_MS).max(base);
    (base * 2u32.pow(exponent)).min(ceiling)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clipboard::source::{ClipboardSource, MemoryClipboard};
    use crate::shared::types::{ClipboardPayload, ImagePayload};

    fn text(s: &str) -> ClipboardPayload {
        ClipboardPayload::Text(s.to_string())
    }

    fn setup() -> (ClipboardMonitor, Arc<MemoryClipboard>) {
        let clipboard = Arc::new(MemoryClipboard::new());
        let settings = ClipboardSettings::default();
        let history = ClipboardHistory::with_settings(clipboard.clone(), &settings);
        (ClipboardMonitor::new(history, &settings), clipboard)
    }

    fn contents(monitor: &ClipboardMonitor) -> Vec<ClipboardPayload> {
        monitor.history().snapshot().into_iter().map(|item| item.payload).collect()
    }

    #[test]
    fn test_value_present_at_startup_is_not_captured() {
        let clipboard = Arc::new(MemoryClipboard::new());
        clipboard.external_write(text("already there"));
        let settings = ClipboardSettings::default();
        let history = ClipboardHistory::with_settings(clipboard.clone(), &settings);
        let monitor = ClipboardMonitor::new(history, &settings);

        assert_eq!(monitor.tick().unwrap(), PollOutcome::Unchanged);
        assert_eq!(monitor.history().count(), 0);
    }

    #[test]
    fn test_transition_is_handled_once() {
        let (monitor, clipboard) = setup();
        clipboard.external_write(text("A"));

        assert_eq!(monitor.tick().unwrap(), PollOutcome::Captured(CaptureOutcome::Inserted));
        assert_eq!(monitor.tick().unwrap(), PollOutcome::Unchanged);
        assert_eq!(contents(&monitor), vec![text("A")]);
    }

    #[test]
    fn test_missed_cycles_capture_latest_value() {
        let (monitor, clipboard) = setup();
        clipboard.external_write(text("A"));
        clipboard.external_write(text("B"));

        monitor.tick().unwrap();

        assert_eq!(contents(&monitor), vec![text("B")]);
    }

    #[test]
    fn test_echo_of_copy_back_is_suppressed() {
        let (monitor, clipboard) = setup();
        clipboard.external_write(text("B"));
        monitor.tick().unwrap();
        clipboard.external_write(text("A"));
        monitor.tick().unwrap();
        let a = monitor.history().get_item(0).unwrap();

        monitor.history().copy_to_clipboard(&a.id).unwrap();

        assert_eq!(monitor.tick().unwrap(), PollOutcome::Captured(CaptureOutcome::EchoSuppressed));
        assert_eq!(contents(&monitor), vec![text("A"), text("B")]);

        // A genuine copy of the same value afterwards still counts
        clipboard.external_write(text("A"));
        assert_eq!(monitor.tick().unwrap(), PollOutcome::Captured(CaptureOutcome::Promoted));
        assert_eq!(contents(&monitor), vec![text("A"), text("B")]);
        assert_eq!(monitor.history().get_item(0).unwrap().id, a.id);
    }

    #[test]
    fn test_copy_back_of_older_item_is_not_promoted() {
        let (monitor, clipboard) = setup();
        clipboard.external_write(text("B"));
        monitor.tick().unwrap();
        clipboard.external_write(text("A"));
        monitor.tick().unwrap();
        let b = monitor.history().get_item(1).unwrap();

        monitor.history().copy_to_clipboard(&b.id).unwrap();
        monitor.tick().unwrap();

        assert_eq!(contents(&monitor), vec![text("A"), text("B")]);
    }

    #[test]
    fn test_echo_waits_behind_an_external_copy() {
        let (monitor, clipboard) = setup();
        clipboard.external_write(text("A"));
        monitor.tick().unwrap();
        let a = monitor.history().get_item(0).unwrap();

        monitor.history().copy_to_clipboard(&a.id).unwrap();
        clipboard.external_write(text("X"));
        assert_eq!(monitor.tick().unwrap(), PollOutcome::Captured(CaptureOutcome::Inserted));

        // Our write shows up late, after the other copy
        clipboard.external_write(text("A"));
        assert_eq!(monitor.tick().unwrap(), PollOutcome::Captured(CaptureOutcome::EchoSuppressed));
        assert_eq!(contents(&monitor), vec![text("X"), text("A")]);
    }

    #[test]
    fn test_failed_read_is_retried_next_cycle() {
        let (monitor, clipboard) = setup();
        clipboard.set_fail_reads(true);
        clipboard.external_write(text("A"));

        assert!(matches!(monitor.tick(), Err(CommandError::SourceUnavailable(_))));
        assert_eq!(monitor.history().count(), 0);

        clipboard.set_fail_reads(false);
        assert_eq!(monitor.tick().unwrap(), PollOutcome::Captured(CaptureOutcome::Inserted));
    }

    #[test]
    fn test_unsupported_and_empty_content_skipped() {
        let (monitor, clipboard) = setup();

        clipboard.offer_unsupported("public.file-url");
        assert_eq!(monitor.tick().unwrap(), PollOutcome::Empty);

        clipboard.offer(Vec::new());
        assert_eq!(monitor.tick().unwrap(), PollOutcome::Empty);
        assert_eq!(monitor.tick().unwrap(), PollOutcome::Unchanged);
        assert_eq!(monitor.history().count(), 0);
    }

    #[test]
    fn test_text_preferred_over_image() {
        let (monitor, clipboard) = setup();
        let image = ClipboardPayload::Image(ImagePayload::new(1, 1, vec![9u8, 9, 9, 255]));

        clipboard.offer(vec![image.clone(), text("caption")]);
        monitor.tick().unwrap();
        clipboard.external_write(image.clone());
        monitor.tick().unwrap();

        assert_eq!(contents(&monitor), vec![image, text("caption")]);
    }

    #[test]
    fn test_paused_monitor_skips_changes() {
        let (monitor, clipboard) = setup();
        monitor.disable();

        clipboard.external_write(text("secret"));
        assert_eq!(monitor.tick().unwrap(), PollOutcome::Paused);

        monitor.enable();
        assert_eq!(monitor.tick().unwrap(), PollOutcome::Unchanged);
        assert_eq!(monitor.history().count(), 0);
    }

    #[test]
    fn test_toggle_announces_state() {
        let (monitor, _) = setup();
        let mut rx = monitor.history().subscribe();

        assert!(!monitor.toggle());
        assert!(monitor.toggle());
        monitor.enable();

        assert!(matches!(rx.try_recv().unwrap(), AppEvent::MonitorToggled(false)));
        assert!(matches!(rx.try_recv().unwrap(), AppEvent::MonitorToggled(true)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_clear_does_not_rearm_token() {
        let (monitor, clipboard) = setup();
        clipboard.external_write(text("A"));
        monitor.tick().unwrap();

        monitor.history().clear();

        assert_eq!(monitor.tick().unwrap(), PollOutcome::Unchanged);
        assert_eq!(monitor.history().count(), 0);
    }

    #[test]
    fn test_backoff_interval() {
        let base = Duration::from_millis(500);

        assert_eq!(backoff_interval(base, 1), base);
        assert_eq!(backoff_interval(base, 10), base);
        assert_eq!(backoff_interval(base, 11), Duration::from_millis(1000));
        assert_eq!(backoff_interval(base, 13), Duration::from_millis(4000));
        assert_eq!(backoff_interval(base, 40), Duration::from_millis(5000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_loop_captures_and_stops() {
        let (monitor, clipboard) = setup();
        let handle = monitor.start();

        clipboard.external_write(text("A"));
        tokio::time::sleep(Duration::from_millis(1200)).await;
        clipboard.external_write(text("B"));
        tokio::time::sleep(Duration::from_millis(1200)).await;

        assert_eq!(contents(&monitor), vec![text("B"), text("A")]);

        handle.stop().await;
        clipboard.external_write(text("C"));
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert_eq!(monitor.history().count(), 2);
        assert_eq!(clipboard.change_token(), 3);
    }
}
