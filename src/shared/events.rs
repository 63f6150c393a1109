use serde::{Serialize, Deserialize};
use super::types::ClipboardHistoryItem;

/// Change notifications published after every mutation of the history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")] // Tagged enum for easier frontend parsing
pub enum AppEvent {
    /// A value seen for the first time was added at the front
    #[serde(rename = "clipboard://captured")]
    ItemCaptured(ClipboardHistoryItem),

    /// An existing value was copied again and moved to the front
    #[serde(rename = "clipboard://promoted")]
    ItemPromoted(ClipboardHistoryItem),

    #[serde(rename = "clipboard://removed")]
    ItemRemoved { id: String },

    #[serde(rename = "clipboard://cleared")]
    HistoryCleared,

    #[serde(rename = "monitor://toggled")]
    MonitorToggled(bool),
}
