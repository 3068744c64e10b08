//! User settings for Daylog.
//!
//! Stores preferences (journal directory, save debounce windows) in a JSON
//! file at an OS-appropriate location.

use crate::core::debounce::EditKind;
use crate::{DaylogError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Persisted settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Directory where journals are created and listed from.
    pub journal_directory: String,
    #[serde(default)]
    pub debounce: DebounceSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            journal_directory: default_journal_directory().to_string_lossy().to_string(),
            debounce: DebounceSettings::default(),
        }
    }
}

/// Trailing-edge save delays in milliseconds, one per kind of edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DebounceSettings {
    pub content_ms: u64,
    pub title_ms: u64,
    pub config_ms: u64,
    pub structure_ms: u64,
}

impl Default for DebounceSettings {
    fn default() -> Self {
        Self { content_ms: 300, title_ms: 300, config_ms: 200, structure_ms: 200 }
    }
}

impl DebounceSettings {
    pub fn window(&self, kind: EditKind) -> Duration {
        let ms = match kind {
            EditKind::Content => self.content_ms,
            EditKind::Title => self.title_ms,
            EditKind::Config => self.config_ms,
            EditKind::Structure => self.structure_ms,
        };
        Duration::from_millis(ms)
    }
}

/// Returns the path to the settings JSON file.
///
/// - macOS / Linux: `~/.config/daylog/settings.json`
/// - Windows: `%APPDATA%/Daylog/settings.json`
pub fn settings_file_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("Daylog").join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config").join("daylog").join("settings.json")
    }
}

/// Returns the default journal directory: `~/Documents/Daylog`.
pub fn default_journal_directory() -> PathBuf {
    dirs::document_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join("Documents"))
        .join("Daylog")
}

/// Loads settings from `path`; returns defaults if the file is missing or corrupt.
pub fn load_settings(path: &Path) -> Settings {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("ignoring corrupt settings file {}: {e}", path.display());
            Settings::default()
        }),
        Err(_) => Settings::default(),
    }
}

/// Saves settings to `path`, creating parent directories as needed.
pub fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| DaylogError::Settings(format!("Failed to create settings directory: {e}")))?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json).map_err(|e| DaylogError::Settings(format!("Failed to write settings: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = load_settings(&dir.path().join("absent.json"));
        assert_eq!(settings.debounce, DebounceSettings::default());
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let temp = NamedTempFile::new().unwrap();
        fs::write(temp.path(), "{ not json").unwrap();
        assert_eq!(load_settings(temp.path()), Settings::default());
    }

    #[test]
    fn test_save_creates_parents_and_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut settings = Settings::default();
        settings.journal_directory = "/tmp/journals".to_string();
        settings.debounce.title_ms = 450;

        save_settings(&path, &settings).unwrap();
        assert_eq!(load_settings(&path), settings);
    }

    #[test]
    fn test_partial_debounce_block_keeps_other_defaults() {
        let temp = NamedTempFile::new().unwrap();
        fs::write(temp.path(), r#"{"journalDirectory":"/j","debounce":{"contentMs":500}}"#).unwrap();
        let settings = load_settings(temp.path());
        assert_eq!(settings.debounce.window(EditKind::Content), Duration::from_millis(500));
        assert_eq!(settings.debounce.window(EditKind::Config), Duration::from_millis(200));
    }
}
