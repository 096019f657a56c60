// SPDX-License-Identifier: MIT OR Apache-2.0
//! Application settings.
//!
//! Settings live in a RON file next to the working directory:
//! - Backend API location and request timeout
//! - Initial window size
//! - Canvas defaults (start layout, grid, minimap, snapping)
//!
//! Environment variables override the API section after loading.

use serde::{Deserialize, Serialize};
use stackflow_graph::StartLayout;
use std::path::Path;
use thiserror::Error;

/// Settings file name
pub const SETTINGS_FILE_NAME: &str = "stackflow.ron";

/// Environment variable overriding [`ApiSettings::base_url`]
pub const ENV_API_URL: &str = "STACKFLOW_API_URL";

/// Environment variable overriding [`ApiSettings::timeout_secs`]
pub const ENV_API_TIMEOUT: &str = "STACKFLOW_API_TIMEOUT_SECS";

/// Settings load/save errors
#[derive(Debug, Error)]
pub enum SettingsError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed settings file
    #[error("Invalid settings file: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Settings could not be serialized
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] ron::Error),
}

/// Backend API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Base URL the `/api/...` paths are appended to
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Window settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    /// Initial width in logical pixels
    pub width: u32,
    /// Initial height in logical pixels
    pub height: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 1600,
            height: 900,
        }
    }
}

/// Canvas defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Graph a new session starts with
    pub start_layout: StartLayout,
    /// Show minimap
    pub show_minimap: bool,
    /// Show grid
    pub show_grid: bool,
    /// Snap dragged and dropped nodes to the grid
    pub snap_to_grid: bool,
    /// Grid size for snapping
    pub snap_size: f32,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            start_layout: StartLayout::Starter,
            show_minimap: true,
            show_grid: true,
            snap_to_grid: false,
            snap_size: 20.0,
        }
    }
}

/// All application settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Backend API
    pub api: ApiSettings,
    /// Window
    pub window: WindowSettings,
    /// Canvas
    pub editor: EditorSettings,
}

impl AppSettings {
    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Ok(ron::from_str(&content)?)
    }

    /// Load settings, falling back to defaults when the file is missing or invalid,
    /// then apply environment overrides
    pub fn load_or_default(path: &Path) -> Self {
        let mut settings = match Self::load(path) {
            Ok(settings) => {
                tracing::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(SettingsError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No settings file at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Ignoring settings file {}: {e}", path.display());
                Self::default()
            }
        };
        settings.apply_overrides(|key| std::env::var(key).ok());
        settings
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String, SettingsError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Apply overrides from a variable lookup (the process environment in production)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api.base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_API_TIMEOUT) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.api.timeout_secs = secs,
                _ => tracing::warn!("Ignoring invalid {ENV_API_TIMEOUT}={raw:?}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_settings() {
        let settings = AppSettings::default();
        assert_eq!(settings.api.base_url, "http://localhost:8000");
        assert_eq!(settings.editor.start_layout, StartLayout::Starter);
        assert!(settings.editor.show_minimap);
        assert!(!settings.editor.snap_to_grid);
    }

    #[test]
    fn test_serialization() {
        let mut settings = AppSettings::default();
        settings.api.base_url = "http://stacks.internal:9000".to_string();
        settings.editor.start_layout = StartLayout::Empty;
        settings.window.width = 1280;

        let ron_str = settings.to_ron().unwrap();
        let loaded: AppSettings = ron::from_str(&ron_str).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let loaded: AppSettings = ron::from_str("(api: (timeout_secs: 5))").unwrap();
        assert_eq!(loaded.api.timeout_secs, 5);
        assert_eq!(loaded.api.base_url, ApiSettings::default().base_url);
        assert_eq!(loaded.window, WindowSettings::default());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_API_URL, " https://api.example.com "),
            (ENV_API_TIMEOUT, "12"),
        ]);
        let mut settings = AppSettings::default();
        settings.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(settings.api.base_url, "https://api.example.com");
        assert_eq!(settings.api.timeout_secs, 12);
    }

    #[test]
    fn test_invalid_timeout_override_is_ignored() {
        let mut settings = AppSettings::default();
        settings.apply_overrides(|key| (key == ENV_API_TIMEOUT).then(|| "soon".to_string()));
        assert_eq!(settings.api.timeout_secs, 30);
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let path = std::env::temp_dir().join("stackflow-settings-that-does-not-exist.ron");
        let err = AppSettings::load(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Io(_)));
    }
}
