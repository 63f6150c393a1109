use tokio::sync::broadcast;
use super::events::AppEvent;

/// Number of events a slow subscriber may lag behind before it starts missing some
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Fan-out channel for [`AppEvent`]s
///
/// Cloning is cheap; every clone publishes into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to every current subscriber
    pub fn emit(&self, event: AppEvent) {
        // No subscribers is the normal state for a headless run
        if let Err(broadcast::error::SendError(event)) = self.sender.send(event) {
            tracing::trace!(?event, "no subscribers for event");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
