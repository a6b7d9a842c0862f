use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::Quality;

const SETTINGS_FILE: &str = "settings.json";

/// Form choices remembered between sessions. URLs are never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub output_directory: Option<PathBuf>,
    pub quality: Quality,
    pub audio_only: bool,
    pub allow_playlist: bool,
    pub use_cookies: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            output_directory: None,
            quality: Quality::Best,
            audio_only: false,
            allow_playlist: false,
            use_cookies: false,
        }
    }
}

/// `<config dir>/ytdl-desk/settings.json`, if the platform has a config dir.
pub fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ytdl-desk").join(SETTINGS_FILE))
}

impl UserSettings {
    /// Loads settings, falling back to defaults when the file is missing or unreadable.
    pub fn load_from(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not read settings");
                return Self::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed settings");
                Self::default()
            }
        }
    }

    pub async fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| format!("Failed to write {}: {}", path.display(), e))
    }
}
