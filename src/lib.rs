pub mod core;
pub mod shared;

use std::sync::Arc;

use crate::core::clipboard::{ClipboardHistory, ClipboardMonitor, ClipboardSource, MemoryClipboard, SystemClipboard};
use crate::shared::events::AppEvent;
use crate::shared::settings::AppSettings;
use crate::shared::CommandResult;

/// Run the clipboard history until Ctrl-C
pub async fn run() -> CommandResult<()> {
    // Load settings
    let settings = AppSettings::load().await.unwrap_or_else(|e| {
        eprintln!("Failed to load settings: {}", e);
        AppSettings::default()
    });
    shared::logging::init_tracing(&settings.logging.level);

    let source: Arc<dyn ClipboardSource> = match SystemClipboard::new() {
        Ok(system) => Arc::new(system),
        Err(e) => {
            tracing::warn!(error = %e, "system clipboard unavailable, using in-memory fallback");
            Arc::new(MemoryClipboard::new())
        }
    };

    // Initialize clipboard history and monitor
    let history = ClipboardHistory::with_settings(source, &settings.clipboard);
    let monitor = ClipboardMonitor::new(history.clone(), &settings.clipboard);

    let mut events = history.subscribe();
    let reporter = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            log_event(&event);
        }
    });

    let handle = monitor.start();
    tracing::info!(capacity = history.capacity(), "pinboard running, press Ctrl-C to quit");

    tokio::signal::ctrl_c().await?;

    handle.stop().await;
    reporter.abort();
    tracing::info!(items = history.count(), "pinboard stopped");
    Ok(())
}

fn log_event(event: &AppEvent) {
    match event {
        AppEvent::ItemCaptured(item) => tracing::debug!(id = %item.id, preview = %item.preview, "new clipboard item"),
        AppEvent::ItemPromoted(item) => tracing::debug!(id = %item.id, "clipboard item moved to front"),
        AppEvent::ItemRemoved { id } => tracing::debug!(%id, "clipboard item removed"),
        AppEvent::HistoryCleared => tracing::debug!("clipboard history cleared"),
        AppEvent::MonitorToggled(enabled) => tracing::debug!(enabled, "clipboard monitor toggled"),
    }
}
