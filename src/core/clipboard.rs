//! Clipboard module
//!
//! Provides clipboard history tracking and monitoring functionality.
//!
//! - `source`: the clipboard contract plus an in-memory implementation
//! - `system`: the OS clipboard behind that contract
//! - `history`: Manages clipboard history with deduplication and capacity limits
//! - `monitor`: Background task that polls the clipboard's change token

pub mod history;
pub mod monitor;
pub mod source;
pub mod state;
pub mod system;

pub use history::{CaptureOutcome, ClipboardHistory};
pub use monitor::{ClipboardMonitor, MonitorHandle, PollOutcome};
pub use source::{ClipboardSource, MemoryClipboard};
pub use state::ClipboardState;
pub use system::SystemClipboard;
