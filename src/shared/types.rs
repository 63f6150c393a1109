use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of characters kept in a text preview
const PREVIEW_CHARS: usize = 100;

/// Kind of representation captured from the clipboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipboardKind {
    Text,
    Image,
}

impl fmt::Display for ClipboardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipboardKind::Text => f.write_str("text"),
            ClipboardKind::Image => f.write_str("image"),
        }
    }
}

/// Raw RGBA pixels as handed out by the OS clipboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub width: usize,
    pub height: usize,
    pub bytes: Arc<[u8]>,
}

impl ImagePayload {
    pub fn new(width: usize, height: usize, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            width,
            height,
            bytes: bytes.into(),
        }
    }
}

/// The value held by a clipboard slot. Exactly one representation per item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum ClipboardPayload {
    Text(String),
    Image(ImagePayload),
}

impl ClipboardPayload {
    pub fn kind(&self) -> ClipboardKind {
        match self {
            ClipboardPayload::Text(_) => ClipboardKind::Text,
            ClipboardPayload::Image(_) => ClipboardKind::Image,
        }
    }

    /// Short human readable rendering for list rows
    pub fn preview(&self) -> String {
        match self {
            ClipboardPayload::Text(text) => {
                let mut chars = text.chars();
                let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
                if chars.next().is_some() {
                    format!("{}...", head)
                } else {
                    head
                }
            }
            ClipboardPayload::Image(image) => format!("[Image {}x{}]", image.width, image.height),
        }
    }

    /// Size of the payload in bytes, used for log lines
    pub fn byte_len(&self) -> usize {
        match self {
            ClipboardPayload::Text(text) => text.len(),
            ClipboardPayload::Image(image) => image.bytes.len(),
        }
    }
}

/// A single clipboard history item
///
/// Two items are equal when their payloads are equal. The `id` only addresses
/// the item from the UI and never takes part in comparisons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipboardHistoryItem {
    pub id: String,
    pub payload: ClipboardPayload,
    pub preview: String,
    pub captured_at: DateTime<Utc>,
}

impl ClipboardHistoryItem {
    /// Create a new item with a fresh id
    pub fn new(payload: ClipboardPayload) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            preview: payload.preview(),
            payload,
            captured_at: Utc::now(),
        }
    }

    /// Create a new text clipboard item
    pub fn new_text(content: impl Into<String>) -> Self {
        Self::new(ClipboardPayload::Text(content.into()))
    }

    /// Create a new image clipboard item
    pub fn new_image(image: ImagePayload) -> Self {
        Self::new(ClipboardPayload::Image(image))
    }

    pub fn kind(&self) -> ClipboardKind {
        self.payload.kind()
    }
}

impl PartialEq for ClipboardHistoryItem {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload
    }
}

impl Eq for ClipboardHistoryItem {}
