use serde::{Deserialize, Serialize};
use tokio::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use directories::ProjectDirs;

use super::errors::{CommandError, CommandResult};
use super::types::ClipboardKind;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub clipboard: ClipboardSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipboardSettings {
    /// How often the change token is sampled
    pub poll_interval_ms: u64,
    /// Maximum number of items kept in history
    pub capacity: usize,
    /// Which representation wins when the clipboard offers several
    pub preferred_kinds: Vec<ClipboardKind>,
}

impl Default for ClipboardSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            capacity: 50,
            preferred_kinds: vec![ClipboardKind::Text, ClipboardKind::Image],
        }
    }
}

impl ClipboardSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive, overridden by RUST_LOG
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppSettings {
    pub fn get_settings_path() -> CommandResult<PathBuf> {
        ProjectDirs::from("com", "pinboard", "pinboard")
            .map(|dirs| dirs.config_dir().join("settings.json"))
            .ok_or_else(|| CommandError::SystemIO("Failed to determine config directory".to_string()))
    }

    pub async fn load() -> CommandResult<Self> {
        let path = Self::get_settings_path()?;
        Self::load_from(&path).await
    }

    /// Load settings from `path`, writing the defaults there first if it doesn't exist
    pub async fn load_from(path: &Path) -> CommandResult<Self> {
        if !fs::try_exists(path).await? {
            let settings = Self::default();
            settings.save_to(path).await?;
            return Ok(settings);
        }

        let content = fs::read_to_string(path).await?;
        let settings: Self = serde_json::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub async fn save_to(&self, path: &Path) -> CommandResult<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    pub fn validate(&self) -> CommandResult<()> {
        let clipboard = &self.clipboard;
        if clipboard.capacity == 0 {
            return Err(CommandError::InvalidInput("clipboard.capacity must be at least 1".to_string()));
        }
        if clipboard.poll_interval_ms == 0 {
            return Err(CommandError::InvalidInput("clipboard.poll_interval_ms must be positive".to_string()));
        }
        if clipboard.preferred_kinds.is_empty() {
            return Err(CommandError::InvalidInput("clipboard.preferred_kinds must not be empty".to_string()));
        }
        for (i, kind) in clipboard.preferred_kinds.iter().enumerate() {
            if clipboard.preferred_kinds[..i].contains(kind) {
                return Err(CommandError::InvalidInput(format!(
                    "clipboard.preferred_kinds lists '{}' twice",
                    kind
                )));
            }
        }
        Ok(())
    }
}
