//! Strict error handling with CommandError enum
//!
//! All errors are serializable so a presentation layer can render them as-is.
//! None of them are fatal: the monitor keeps polling and the history keeps
//! its contents whatever a single operation returns.

use thiserror::Error;
use serde::Serialize;

/// Command execution errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum CommandError {
    /// The clipboard could not be read or written (transient OS denial, lock held elsewhere...)
    #[error("Clipboard unavailable: {0}")]
    SourceUnavailable(String),

    /// The clipboard offers a representation we don't capture
    #[error("Unsupported clipboard content: {0}")]
    UnsupportedKind(String),

    /// An item id that is no longer in the history (evicted or cleared)
    #[error("Clipboard item not found: {0}")]
    StaleReference(String),

    /// File system error (settings)
    #[error("System I/O error: {0}")]
    SystemIO(String),

    /// Invalid input or parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<std::io::Error> for CommandError {
    fn from(err: std::io::Error) -> Self {
        CommandError::SystemIO(err.to_string())
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(err: serde_json::Error) -> Self {
        CommandError::InvalidInput(format!("JSON error: {}", err))
    }
}

// Helper type alias for command results
pub type CommandResult<T> = Result<T, CommandError>;
